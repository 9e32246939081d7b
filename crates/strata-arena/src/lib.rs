//! Region arenas over reserved virtual memory.
//!
//! An [`Arena`] reserves a large range of address space up front and
//! commits physical pages only as allocations reach them. Memory is
//! reclaimed in bulk by rewinding the arena's offset, either directly
//! with [`Arena::pop_to`] or through a scoped [`Checkpoint`].
//!
//! # Architecture
//!
//! ```text
//! Arena
//! ├── ArenaConfig (limit, commit size, mode)
//! ├── Block × N (one in contiguous mode, a stack in chained mode)
//! │   └── Backing → Region on an Arc<dyn VirtualMemory>
//! └── Allocation handles (arena id + global offset + len)
//!
//! ScratchPool (per thread by default)
//! └── slots → RefCell<Arena>, shared by stacked Checkpoint guards
//! ```
//!
//! # Safety
//!
//! The private `raw` module is the only place in this crate that contains
//! `unsafe` code. Every byte view it produces is bounds-checked against
//! the committed prefix of its reservation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
mod block;
pub mod checkpoint;
pub mod config;
mod raw;
pub mod scratch;

pub use arena::Arena;
pub use checkpoint::{ArenaMut, Checkpoint};
pub use config::{ArenaConfig, PoolConfig};
pub use scratch::{with_scratch, with_thread_pool, ScratchPool};
pub use strata_core::{Allocation, ArenaError, ArenaId, ArenaMode, MemoryError, PushFlags};
pub use strata_os::VirtualMemory;
