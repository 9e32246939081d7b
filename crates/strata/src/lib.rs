//! Strata: region arenas over reserved virtual memory.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Strata sub-crates. For most users, adding `strata` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let mut arena = Arena::new(64 << 20).unwrap();
//! let mark = arena.offset();
//!
//! let ids = arena.push_copy_slice(&[3u32, 1, 4, 1, 5], PushFlags::NONE).unwrap();
//! assert_eq!(arena.slice::<u32>(&ids).unwrap()[2], 4);
//!
//! // Temporaries come from a scratch arena that is not the one holding `ids`.
//! let sum = with_scratch(&[arena.id()], |scratch| {
//!     let tmp = scratch.push_array::<u64>(5, PushFlags::NONE).unwrap();
//!     let mut staging = scratch.arena();
//!     let tmp = staging.slice_mut::<u64>(&tmp).unwrap();
//!     tmp.iter_mut().enumerate().for_each(|(i, v)| *v = i as u64);
//!     tmp.iter().sum::<u64>()
//! })
//! .unwrap();
//! assert_eq!(sum, 10);
//!
//! arena.pop_to(mark);
//! assert_eq!(arena.used(), 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `strata-arena` | `Arena`, `Checkpoint`, `ScratchPool`, configs |
//! | [`types`] | `strata-core` | IDs, handles, flags, errors, alignment helpers |
//! | [`os`] | `strata-os` | The `VirtualMemory` trait and its backends |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Arenas, checkpoints, and scratch pools (`strata-arena`).
pub use strata_arena as arena;

/// Core vocabulary: IDs, allocation handles, flags, and errors
/// (`strata-core`).
pub use strata_core as types;

/// Virtual-memory backends (`strata-os`).
///
/// Implement [`os::VirtualMemory`] to run arenas on a custom backend, or
/// use [`os::SystemMemory`] and [`os::HeapMemory`].
pub use strata_os as os;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use strata_arena::{
        with_scratch, with_thread_pool, Arena, ArenaConfig, ArenaMut, Checkpoint, PoolConfig,
        ScratchPool,
    };

    // Core types
    pub use strata_core::{Allocation, ArenaId, ArenaMode, PushFlags};

    // Errors
    pub use strata_core::{ArenaError, MemoryError};

    // Backends
    pub use strata_os::{HeapMemory, SystemMemory, VirtualMemory};
}
