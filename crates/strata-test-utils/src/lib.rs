//! Test utilities for Strata development.
//!
//! Provides instrumented [`VirtualMemory`](strata_os::VirtualMemory)
//! backends ([`CountingMemory`], [`FaultyMemory`]) and small fixtures for
//! setting up tracing and arena configs in tests.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod fixtures;
pub mod memory;

pub use fixtures::init_tracing;
pub use memory::{CountingMemory, FaultyMemory};
