//! Core types and errors for the Strata arena allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the platform layer (`strata-os`) and the
//! allocator itself (`strata-arena`): arena identifiers, allocation
//! handles, push flags, alignment arithmetic, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod align;
pub mod error;
pub mod flags;
pub mod handle;
pub mod id;
pub mod size;

pub use error::{ArenaError, MemoryError};
pub use flags::{ArenaMode, PushFlags};
pub use handle::Allocation;
pub use id::ArenaId;
