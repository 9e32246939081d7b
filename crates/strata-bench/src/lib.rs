//! Benchmark profiles for the Strata arena allocator.
//!
//! - [`frame_arena`]: contiguous arena sized like a per-frame allocator
//! - [`chained_arena`]: chained arena on the heap backend
//! - [`mixed_workload`]: a fixed, repeatable sequence of push sizes and
//!   alignments

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use strata_arena::{Arena, ArenaConfig, ArenaMode};
use strata_core::size::{gib, kib, mib};
use strata_os::HeapMemory;

/// 1 GiB contiguous arena with 64 KiB commit slices on the system backend.
///
/// Falls back to chained mode on hosts without partial commit.
pub fn frame_arena() -> Arena {
    let config = ArenaConfig::new(gib(1))
        .with_commit_size(kib(64))
        .with_mode(ArenaMode::Contiguous);
    Arena::with_config(config, strata_os::system()).expect("benchmark arena")
}

/// 256 MiB chained arena with 1 MiB blocks on the heap backend.
pub fn chained_arena() -> Arena {
    let config = ArenaConfig::new(mib(256)).with_commit_size(mib(1));
    Arena::with_config(config, Arc::new(HeapMemory::new())).expect("benchmark arena")
}

/// `count` `(size, align)` pairs cycling through small, medium and the
/// occasional large request. Identical on every call.
pub fn mixed_workload(count: usize) -> Vec<(usize, usize)> {
    const SIZES: [usize; 8] = [16, 24, 64, 100, 256, 1000, 4096, 40_000];
    const ALIGNS: [usize; 5] = [1, 4, 8, 16, 64];
    (0..count)
        .map(|i| (SIZES[(i * 5) % SIZES.len()], ALIGNS[(i * 3) % ALIGNS.len()]))
        .collect()
}

/// Total bytes `workload` pushes, ignoring padding.
pub fn workload_bytes(workload: &[(usize, usize)]) -> usize {
    workload.iter().map(|&(size, _)| size).sum()
}
