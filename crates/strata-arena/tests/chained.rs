//! Integration tests: chained arenas.
//!
//! Run on the heap backend, which cannot commit partially and so forces
//! chained mode on every host.

use strata_arena::{Arena, ArenaConfig, ArenaError, ArenaMode, MemoryError, PushFlags};
use strata_core::size::{kib, mib};
use strata_test_utils::{init_tracing, CountingMemory, FaultyMemory};

fn config(limit: usize, block: usize) -> ArenaConfig {
    ArenaConfig::new(limit).with_commit_size(block)
}

#[test]
fn heap_backend_runs_chained() {
    init_tracing();
    let memory = CountingMemory::heap();
    let arena = Arena::with_config(config(kib(256), kib(64)), memory.clone()).unwrap();
    assert_eq!(arena.mode(), ArenaMode::Chained);
    assert_eq!(arena.block_count(), 1);
    assert_eq!(arena.committed(), kib(64));
    assert_eq!(memory.live_reserved(), kib(64));
}

#[test]
fn spilling_push_links_exactly_one_block_and_rewind_releases_it() {
    init_tracing();
    let memory = CountingMemory::heap();
    let mut arena = Arena::with_config(config(kib(512), kib(64)), memory.clone()).unwrap();

    arena.push(kib(64) - 64 - 10, 1, PushFlags::NONE).unwrap();
    let mark = arena.offset();
    assert_eq!(arena.block_count(), 1);

    let spilled = arena.push(100, 8, PushFlags::NONE).unwrap();
    assert_eq!(arena.block_count(), 2);
    assert_eq!(memory.reserve_calls(), 2);
    assert_eq!(spilled.offset(), kib(64) + 64);
    assert_eq!(arena.committed(), kib(128));

    arena.pop_to(mark);
    assert_eq!(arena.block_count(), 1);
    assert_eq!(memory.release_calls(), 1);
    assert_eq!(memory.live_reserved(), kib(64));
    assert_eq!(arena.committed(), kib(64));

    // The abandoned tail of the first block is usable again.
    let reused = arena.push(10, 1, PushFlags::NONE).unwrap();
    assert_eq!(reused.offset(), mark);
    assert_eq!(arena.block_count(), 1);
}

#[test]
fn rewind_into_a_block_header_keeps_the_previous_block_valid() {
    init_tracing();
    let memory = CountingMemory::heap();
    let mut arena = Arena::with_config(config(mib(1), kib(64)), memory.clone()).unwrap();
    let kept = arena.push(kib(60), 1, PushFlags::NONE).unwrap();
    arena.push(kib(8), 8, PushFlags::NONE).unwrap();
    assert_eq!(arena.block_count(), 2);

    arena.pop_size(kib(8) + 32);
    assert_eq!(arena.block_count(), 1);
    assert_eq!(arena.offset(), kib(64));
    assert_eq!(arena.committed(), kib(64));
    assert_eq!(memory.live_reserved(), kib(64));
    assert!(arena.bytes(&kept).is_ok());

    let tail = arena.push(16, 8, PushFlags::NONE).unwrap();
    assert_eq!(tail.offset(), kib(64) + 64);
    assert!(arena.bytes(&tail).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn oversized_push_gets_a_block_of_its_own() {
    init_tracing();
    let mut arena = Arena::with_config(config(kib(1024), kib(64)), CountingMemory::heap()).unwrap();
    let big = arena.push(kib(200), 16, PushFlags::NONE).unwrap();
    assert_eq!(arena.block_count(), 2);
    assert_eq!(big.offset(), kib(64) + 64);
    // 200 KiB + header rounds up to 256 KiB.
    assert_eq!(arena.committed(), kib(64) + kib(256));
    assert!(arena.bytes(&big).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn chained_ceiling() {
    init_tracing();
    let mut arena = Arena::with_config(config(kib(128), kib(64)), CountingMemory::heap()).unwrap();
    arena.push(kib(64) - 64, 1, PushFlags::NONE).unwrap();

    // One byte more than the last block can hold after its header.
    assert!(matches!(
        arena.push(kib(64) - 63, 1, PushFlags::NONE),
        Err(ArenaError::CapacityExceeded { .. })
    ));
    assert_eq!(arena.block_count(), 1);

    let last = arena.push(kib(64) - 64, 1, PushFlags::NONE).unwrap();
    assert_eq!(last.end(), arena.limit());
    assert_eq!(arena.committed(), arena.limit());
    assert!(matches!(
        arena.push(1, 1, PushFlags::NONE),
        Err(ArenaError::CapacityExceeded { .. })
    ));
}

#[test]
fn committed_never_exceeds_limit() {
    init_tracing();
    let memory = CountingMemory::heap();
    let mut arena = Arena::with_config(config(kib(320), kib(48)), memory.clone()).unwrap();
    let mut pushed = 0;
    while arena.push(kib(30), 64, PushFlags::NONE).is_ok() {
        pushed += 1;
        assert!(arena.committed() <= arena.limit());
        assert!(memory.live_reserved() <= arena.limit());
    }
    assert!(pushed > 0);
}

#[test]
fn page_alignment_inside_new_block() {
    init_tracing();
    let mut arena = Arena::with_config(config(kib(256), kib(16)), CountingMemory::heap()).unwrap();
    arena.push(kib(16) - 100, 1, PushFlags::NONE).unwrap();
    let page = arena.push(kib(8), 4096, PushFlags::NONE).unwrap();
    assert_eq!(arena.block_count(), 2);
    assert_eq!(page.offset(), kib(16) + 4096);
    assert_eq!(arena.address(&page).unwrap() % 4096, 0);
}

#[test]
fn failed_block_reserve_leaves_arena_unchanged() {
    init_tracing();
    let memory = FaultyMemory::heap();
    let mut arena = Arena::with_config(config(kib(512), kib(64)), memory.clone()).unwrap();
    arena.push(kib(60), 1, PushFlags::NONE).unwrap();
    let (offset, committed) = (arena.offset(), arena.committed());

    memory.fail_reserve_after(0);
    assert!(matches!(
        arena.push(kib(8), 1, PushFlags::NONE),
        Err(ArenaError::Memory(MemoryError::ReserveFailed { .. }))
    ));
    assert_eq!(arena.block_count(), 1);
    assert_eq!(arena.offset(), offset);
    assert_eq!(arena.committed(), committed);

    memory.heal();
    arena.push(kib(8), 1, PushFlags::NONE).unwrap();
    assert_eq!(arena.block_count(), 2);
}

#[test]
fn failed_block_commit_releases_the_reservation() {
    init_tracing();
    let counting = CountingMemory::heap();
    let memory = std::sync::Arc::new(FaultyMemory::new(counting.clone()));
    let mut arena = Arena::with_config(config(kib(512), kib(64)), memory.clone()).unwrap();
    arena.push(kib(60), 1, PushFlags::NONE).unwrap();

    memory.fail_commit_after(0);
    assert!(matches!(
        arena.push(kib(8), 1, PushFlags::NONE),
        Err(ArenaError::Memory(MemoryError::CommitFailed { .. }))
    ));
    assert_eq!(arena.block_count(), 1);
    assert_eq!(counting.reserve_calls(), 2);
    assert_eq!(counting.live_reserved(), kib(64));
}

#[test]
fn reset_keeps_only_first_block() {
    init_tracing();
    let memory = CountingMemory::heap();
    let mut arena = Arena::with_config(config(kib(1024), kib(64)), memory.clone()).unwrap();
    for _ in 0..6 {
        arena.push(kib(50), 8, PushFlags::NONE).unwrap();
    }
    assert_eq!(arena.block_count(), 6);
    arena.reset();
    assert_eq!(arena.block_count(), 1);
    assert_eq!(arena.offset(), 64);
    assert_eq!(memory.live_reserved(), kib(64));
}

#[test]
fn drop_releases_every_block() {
    init_tracing();
    let memory = CountingMemory::heap();
    {
        let mut arena = Arena::with_config(config(kib(1024), kib(64)), memory.clone()).unwrap();
        for _ in 0..4 {
            arena.push(kib(50), 8, PushFlags::NONE).unwrap();
        }
    }
    assert_eq!(memory.reserve_calls(), 4);
    assert_eq!(memory.release_calls(), 4);
    assert_eq!(memory.live_reserved(), 0);
}

#[test]
fn handles_into_released_blocks_are_stale() {
    init_tracing();
    let mut arena = Arena::with_config(config(kib(512), kib(64)), CountingMemory::heap()).unwrap();
    let mark = arena.offset();
    let keep = arena.push(16, 8, PushFlags::NONE).unwrap();
    let kept_mark = arena.offset();
    arena.push(kib(62), 1, PushFlags::NONE).unwrap();
    let gone = arena.push(kib(10), 8, PushFlags::NONE).unwrap();
    assert_eq!(arena.block_count(), 2);

    arena.pop_to(kept_mark);
    assert!(arena.bytes(&keep).is_ok());
    assert!(matches!(
        arena.bytes(&gone),
        Err(ArenaError::StaleAllocation { .. })
    ));
    arena.pop_to(mark);
    assert!(arena.bytes(&keep).is_err());
}
