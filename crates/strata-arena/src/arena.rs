//! The region arena: reserve once, commit on demand, rewind in bulk.
//!
//! An [`Arena`] hands out byte ranges from a bump cursor (its *offset*)
//! and frees them only by moving that cursor back. Two growth strategies
//! share one interface:
//!
//! ```text
//! contiguous   [hdr|user bytes........|   committed   ]  reserved .. limit
//!                   ^floor            ^offset          ^committed
//!
//! chained      [hdr|block 0 ....][hdr|block 1 ....][hdr|block 2 ..]
//!              base 0            base = committed   current (last)
//! ```
//!
//! Offsets are global: in chained mode a block's first byte sits at the
//! sum of the capacities of the blocks before it, so offsets stay
//! monotonic across blocks and a saved offset can always be rewound to.

use std::sync::Arc;

use bytemuck::Pod;
use smallvec::SmallVec;
use strata_core::align::{align_up, clamp_alignment, padding_for, round_up};
use strata_core::{Allocation, ArenaError, ArenaId, ArenaMode, MemoryError, PushFlags};
use strata_os::VirtualMemory;

use crate::block::{Block, BLOCK_MAGIC};
use crate::checkpoint::Checkpoint;
use crate::config::ArenaConfig;
use crate::raw::Backing;

/// Global offset of the first user byte of every arena.
const FLOOR: usize = ArenaConfig::HEADER_RESERVE;

/// A reserve/commit region allocator.
///
/// Allocations are addressed through [`Allocation`] handles and read or
/// written through the arena's bounds-checked accessors. An arena is
/// single-owner and, since it holds raw region pointers, neither `Send`
/// nor `Sync`.
///
/// # Example
///
/// ```
/// use strata_arena::{Arena, PushFlags};
///
/// let mut arena = Arena::new(1 << 20).unwrap();
/// let mark = arena.offset();
/// let name = arena.push_copy(b"strata", 1, PushFlags::NONE).unwrap();
/// assert_eq!(arena.bytes(&name).unwrap(), b"strata");
/// arena.pop_to(mark);
/// assert!(arena.bytes(&name).is_err());
/// ```
pub struct Arena {
    id: ArenaId,
    mode: ArenaMode,
    memory: Arc<dyn VirtualMemory>,
    /// Global high-water mark.
    offset: usize,
    /// Contiguous: the committed prefix. Chained: sum of block capacities.
    committed: usize,
    limit: usize,
    commit_size: usize,
    /// Never empty; the last block is current.
    blocks: SmallVec<[Block; 2]>,
}

impl Arena {
    /// Create an arena of at most `limit` bytes on the system backend with
    /// the default commit size.
    pub fn new(limit: usize) -> Result<Self, ArenaError> {
        Self::with_config(ArenaConfig::new(limit), strata_os::system())
    }

    /// Create an arena from an explicit config and backend.
    pub fn with_config(
        config: ArenaConfig,
        memory: Arc<dyn VirtualMemory>,
    ) -> Result<Self, ArenaError> {
        let (mode, limit, commit_size) =
            config.resolve(memory.page_size(), memory.supports_partial_commit())?;
        let id = ArenaId::next();

        let reserve = match mode {
            ArenaMode::Contiguous => limit,
            ArenaMode::Chained => commit_size,
        };
        let mut backing = Backing::reserve(Arc::clone(&memory), reserve)?;
        backing.commit_to(commit_size)?;
        let block = Block::new(backing, id, 0, FLOOR);

        tracing::debug!(
            arena = %id,
            %mode,
            limit,
            commit_size,
            "created arena"
        );

        let mut blocks = SmallVec::new();
        blocks.push(block);
        Ok(Self {
            id,
            mode,
            memory,
            offset: FLOOR,
            committed: commit_size,
            limit,
            commit_size,
            blocks,
        })
    }

    // ── Introspection ───────────────────────────────────────────

    /// This arena's unique identifier.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Operating mode, fixed at creation.
    pub fn mode(&self) -> ArenaMode {
        self.mode
    }

    /// Current global high-water mark.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes with physical backing. In chained mode, the sum of all block
    /// capacities.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Effective limit after rounding.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Effective growth granularity after rounding.
    pub fn commit_size(&self) -> usize {
        self.commit_size
    }

    /// Number of blocks. Always 1 for contiguous arenas.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Lowest offset user data can occupy; rewinds are clamped to it.
    pub fn floor(&self) -> usize {
        FLOOR
    }

    /// Bytes between the floor and the offset, padding and chained block
    /// headers included.
    pub fn used(&self) -> usize {
        self.offset - FLOOR
    }

    /// Save the current offset; the arena rewinds to it when the returned
    /// guard is dropped.
    pub fn checkpoint(&mut self) -> Checkpoint<'_> {
        Checkpoint::borrowed(self)
    }

    fn current(&self) -> &Block {
        match self.blocks.last() {
            Some(block) => block,
            None => unreachable!("arena {} has no blocks", self.id),
        }
    }

    fn current_mut(&mut self) -> &mut Block {
        match self.blocks.last_mut() {
            Some(block) => block,
            None => unreachable!("arena has no blocks"),
        }
    }

    // ── Push ────────────────────────────────────────────────────

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// `align` is clamped to `[1, 4096]` and rounded up to a power of two.
    /// The bytes are zeroed unless `flags` contains
    /// [`PushFlags::NO_ZERO`]. Fails with
    /// [`CapacityExceeded`](ArenaError::CapacityExceeded) if the push
    /// would pass the limit and with [`Memory`](ArenaError::Memory) if the
    /// host refuses backing; either way the arena is unchanged.
    pub fn push(
        &mut self,
        size: usize,
        align: usize,
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        let align = clamp_alignment(align);
        let limit = self.limit;
        let exceeded = move |requested| ArenaError::CapacityExceeded { requested, limit };
        let start = self
            .offset
            .checked_add(padding_for(self.offset, align))
            .ok_or_else(|| exceeded(usize::MAX))?;
        let end = start
            .checked_add(size)
            .ok_or_else(|| exceeded(usize::MAX))?;
        if end > limit {
            return Err(exceeded(end));
        }

        let start = if end <= self.committed {
            start
        } else {
            match self.mode {
                ArenaMode::Contiguous => {
                    self.grow_contiguous(end)?;
                    start
                }
                ArenaMode::Chained => self.chain_block(size, align)?,
            }
        };
        let end = start + size;

        let block = self.current_mut();
        let local = start - block.base();
        if !flags.contains(PushFlags::NO_ZERO) {
            block.bytes_mut(local, size).fill(0);
        }
        block.set_offset(local + size);
        self.offset = end;

        tracing::trace!(arena = %self.id, offset = start, len = size, align, "push");
        Ok(Allocation::new(self.id, start, size))
    }

    /// Allocate `src.len()` bytes aligned to `align` and copy `src` in.
    ///
    /// The copy overwrites every byte, so the allocation is never
    /// zero-filled first.
    pub fn push_copy(
        &mut self,
        src: &[u8],
        align: usize,
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        let allocation = self.push(src.len(), align, flags | PushFlags::NO_ZERO)?;
        self.bytes_mut(&allocation)?.copy_from_slice(src);
        Ok(allocation)
    }

    /// Allocate room for `count` values of `T`, aligned for `T`.
    pub fn push_array<T: Pod>(
        &mut self,
        count: usize,
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        let size = std::mem::size_of::<T>()
            .checked_mul(count)
            .ok_or(ArenaError::CapacityExceeded {
                requested: usize::MAX,
                limit: self.limit,
            })?;
        self.push(size, std::mem::align_of::<T>(), flags)
    }

    /// Allocate a copy of `src`, aligned for `T`.
    pub fn push_copy_slice<T: Pod>(
        &mut self,
        src: &[T],
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        self.push_copy(bytemuck::cast_slice(src), std::mem::align_of::<T>(), flags)
    }

    /// Commit enough of the reservation to cover `end`.
    fn grow_contiguous(&mut self, end: usize) -> Result<(), ArenaError> {
        let target = round_up(end, self.commit_size)
            .unwrap_or(usize::MAX)
            .min(self.limit);
        let id = self.id;
        let block = self.current_mut();
        if let Err(e) = block.commit_to(target) {
            tracing::warn!(arena = %id, target, error = %e, "arena growth failed");
            return Err(e.into());
        }
        self.committed = target;
        tracing::debug!(arena = %self.id, committed = target, "committed more backing");
        Ok(())
    }

    /// Link a fresh block big enough for a `size`-byte push at `align` and
    /// return the global offset of that push.
    ///
    /// The rest of the current block is abandoned until a rewind reaches
    /// back into it.
    fn chain_block(&mut self, size: usize, align: usize) -> Result<usize, ArenaError> {
        let limit = self.limit;
        let exceeded = move |requested| ArenaError::CapacityExceeded { requested, limit };
        let header = align_up(FLOOR, align).ok_or_else(|| exceeded(usize::MAX))?;
        let total = header
            .checked_add(size)
            .ok_or_else(|| exceeded(usize::MAX))?;
        let remaining = limit - self.committed;
        let block_size = round_up(total, self.commit_size)
            .unwrap_or(usize::MAX)
            .min(remaining);
        if total > block_size {
            return Err(exceeded(self.committed.saturating_add(total)));
        }

        let block = self.reserve_block(block_size, header).map_err(|e| {
            tracing::warn!(arena = %self.id, block_size, error = %e, "arena chaining failed");
            ArenaError::from(e)
        })?;
        let base = block.base();
        self.blocks.push(block);
        self.committed += block_size;

        tracing::debug!(
            arena = %self.id,
            base,
            block_size,
            blocks = self.blocks.len(),
            "chained new block"
        );
        Ok(base + header)
    }

    fn reserve_block(&self, block_size: usize, floor: usize) -> Result<Block, MemoryError> {
        let mut backing = Backing::reserve(Arc::clone(&self.memory), block_size)?;
        backing.commit_to(block_size)?;
        Ok(Block::new(backing, self.id, self.committed, floor))
    }

    // ── Pop ─────────────────────────────────────────────────────

    /// Rewind the high-water mark to `offset`.
    ///
    /// Offsets below the floor are clamped to it, and in chained arenas
    /// offsets inside a released block's header are clamped down to the
    /// end of the block before it. Contiguous arenas
    /// decommit whole commit slices above the new mark (never the first);
    /// chained arenas release every block whose first user byte lies above
    /// it.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is above the current offset.
    pub fn pop_to(&mut self, offset: usize) {
        assert!(
            offset <= self.offset,
            "cannot rewind arena {} forward from {} to {offset}",
            self.id,
            self.offset
        );
        let mut mark = offset.max(FLOOR);

        match self.mode {
            ArenaMode::Contiguous => {
                let keep = round_up(mark, self.commit_size)
                    .unwrap_or(self.limit)
                    .clamp(self.commit_size, self.limit);
                let block = self.current_mut();
                if keep < block.committed() {
                    block.decommit_to(keep);
                    self.committed = keep;
                    tracing::debug!(arena = %self.id, committed = keep, "decommitted backing");
                }
                self.current_mut().set_offset(mark);
            }
            ArenaMode::Chained => {
                let mut released = 0;
                while self.blocks.len() > 1 && mark < self.current().user_start() {
                    if let Some(block) = self.blocks.pop() {
                        self.committed -= block.capacity();
                        released += 1;
                    }
                }
                if released > 0 {
                    tracing::debug!(
                        arena = %self.id,
                        released,
                        committed = self.committed,
                        "released chained blocks"
                    );
                }
                // A mark inside a released block's header lands on the end
                // of the block before it.
                let block = self.current_mut();
                let local = (mark - block.base()).min(block.committed());
                block.set_offset(local);
                mark = block.base() + local;
            }
        }

        self.offset = mark;
        self.debug_check_current();
        tracing::trace!(arena = %self.id, offset = mark, "pop");
    }

    /// Rewind by `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` exceeds [`used`](Self::used).
    pub fn pop_size(&mut self, size: usize) {
        assert!(
            size <= self.used(),
            "cannot pop {size} bytes from arena {} with {} bytes in use",
            self.id,
            self.used()
        );
        self.pop_to(self.offset - size);
    }

    /// Rewind to the floor. Chained arenas keep only their first block;
    /// contiguous arenas keep only their first commit slice.
    pub fn reset(&mut self) {
        self.pop_to(FLOOR);
        tracing::debug!(arena = %self.id, "reset");
    }

    /// Tear down every reservation. Equivalent to dropping the arena.
    pub fn release(self) {
        tracing::debug!(
            arena = %self.id,
            blocks = self.blocks.len(),
            committed = self.committed,
            "released arena"
        );
    }

    fn debug_check_current(&self) {
        if cfg!(debug_assertions) {
            let header = self.current().header();
            debug_assert_eq!(header.magic, BLOCK_MAGIC);
            debug_assert_eq!(header.arena, self.id.get());
            debug_assert_eq!(header.base as usize, self.current().base());
            debug_assert_eq!(header.capacity as usize, self.current().capacity());
            debug_assert_eq!(header.floor as usize, self.current().floor());
        }
    }

    // ── Access ──────────────────────────────────────────────────

    /// Find the block holding `allocation` and its local offset.
    fn locate(&self, allocation: &Allocation) -> Result<(usize, usize), ArenaError> {
        if allocation.arena() != self.id {
            return Err(ArenaError::ForeignAllocation {
                expected: self.id,
                found: allocation.arena(),
            });
        }
        let stale = ArenaError::StaleAllocation {
            end: allocation.end(),
            offset: self.offset,
        };
        if allocation.end() > self.offset || allocation.offset() < FLOOR {
            return Err(stale);
        }
        // The first block has base 0, so the partition point is at least 1.
        let index = self
            .blocks
            .partition_point(|b| b.base() <= allocation.offset())
            - 1;
        let block = &self.blocks[index];
        let local = allocation.offset() - block.base();
        let below_floor = local < block.floor() && !allocation.is_empty();
        if below_floor || local + allocation.len() > block.offset() {
            return Err(stale);
        }
        Ok((index, local))
    }

    /// Shared view of an allocation's bytes.
    pub fn bytes(&self, allocation: &Allocation) -> Result<&[u8], ArenaError> {
        let (index, local) = self.locate(allocation)?;
        Ok(self.blocks[index].bytes(local, allocation.len()))
    }

    /// Exclusive view of an allocation's bytes.
    pub fn bytes_mut(&mut self, allocation: &Allocation) -> Result<&mut [u8], ArenaError> {
        let (index, local) = self.locate(allocation)?;
        Ok(self.blocks[index].bytes_mut(local, allocation.len()))
    }

    /// Typed view of an allocation.
    ///
    /// Fails with [`Misaligned`](ArenaError::Misaligned) if the length is
    /// not a multiple of `size_of::<T>()` or the bytes are not aligned
    /// for `T`.
    pub fn slice<T: Pod>(&self, allocation: &Allocation) -> Result<&[T], ArenaError> {
        bytemuck::try_cast_slice(self.bytes(allocation)?).map_err(|e| ArenaError::Misaligned {
            reason: e.to_string(),
        })
    }

    /// Exclusive typed view of an allocation.
    pub fn slice_mut<T: Pod>(&mut self, allocation: &Allocation) -> Result<&mut [T], ArenaError> {
        bytemuck::try_cast_slice_mut(self.bytes_mut(allocation)?).map_err(|e| {
            ArenaError::Misaligned {
                reason: e.to_string(),
            }
        })
    }

    /// Machine address of an allocation's first byte.
    pub fn address(&self, allocation: &Allocation) -> Result<usize, ArenaError> {
        let (index, local) = self.locate(allocation)?;
        Ok(self.blocks[index].address(local))
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("offset", &self.offset)
            .field("committed", &self.committed)
            .field("limit", &self.limit)
            .field("commit_size", &self.commit_size)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::size::{kib, mib};
    use strata_os::HeapMemory;

    fn contiguous(limit: usize, commit: usize) -> Arena {
        let config = ArenaConfig::new(limit)
            .with_commit_size(commit)
            .with_mode(ArenaMode::Contiguous);
        Arena::with_config(config, strata_os::system()).unwrap()
    }

    fn chained(limit: usize, commit: usize) -> Arena {
        let config = ArenaConfig::new(limit)
            .with_commit_size(commit)
            .with_mode(ArenaMode::Chained);
        Arena::with_config(config, Arc::new(HeapMemory::new())).unwrap()
    }

    #[test]
    fn fresh_arena_starts_at_floor() {
        let arena = contiguous(mib(1), kib(64));
        assert_eq!(arena.offset(), 64);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.block_count(), 1);
        assert!(arena.committed() >= kib(64));
    }

    #[test]
    fn pushes_are_ordered_and_disjoint() {
        let mut arena = contiguous(mib(1), kib(64));
        let a = arena.push(10, 1, PushFlags::NONE).unwrap();
        let b = arena.push(10, 1, PushFlags::NONE).unwrap();
        assert_eq!(a.offset(), 64);
        assert_eq!(b.offset(), 74);
        assert_eq!(arena.offset(), 84);
    }

    #[test]
    fn push_pads_to_alignment() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(1, 1, PushFlags::NONE).unwrap();
        let a = arena.push(8, 16, PushFlags::NONE).unwrap();
        assert_eq!(a.offset(), 80);
        assert_eq!(arena.address(&a).unwrap() % 16, 0);
    }

    #[test]
    fn odd_alignment_rounds_up_to_power_of_two() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(1, 1, PushFlags::NONE).unwrap();
        let a = arena.push(4, 3, PushFlags::NONE).unwrap();
        assert_eq!(a.offset() % 4, 0);
    }

    #[test]
    fn contiguous_growth_commits_whole_slices() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(kib(64), 1, PushFlags::NONE).unwrap();
        assert_eq!(arena.committed(), kib(128));
    }

    #[test]
    fn push_past_limit_is_rejected_without_change() {
        let mut arena = contiguous(kib(64), kib(4));
        let before = arena.offset();
        let err = arena.push(kib(64), 1, PushFlags::NONE).unwrap_err();
        assert!(matches!(err, ArenaError::CapacityExceeded { .. }));
        assert_eq!(arena.offset(), before);
    }

    #[test]
    fn push_overflow_is_capacity_exceeded() {
        let mut arena = contiguous(kib(64), kib(4));
        assert!(matches!(
            arena.push(usize::MAX, 1, PushFlags::NONE),
            Err(ArenaError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            arena.push_array::<u64>(usize::MAX / 4, PushFlags::NONE),
            Err(ArenaError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn push_copy_copies() {
        let mut arena = contiguous(mib(1), kib(64));
        let a = arena.push_copy(b"hello", 1, PushFlags::NONE).unwrap();
        assert_eq!(arena.bytes(&a).unwrap(), b"hello");
    }

    #[test]
    fn typed_push_and_view() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(1, 1, PushFlags::NONE).unwrap();
        let a = arena.push_copy_slice(&[1u32, 2, 3], PushFlags::NONE).unwrap();
        assert_eq!(a.offset() % 4, 0);
        assert_eq!(arena.slice::<u32>(&a).unwrap(), &[1, 2, 3]);

        let b = arena.push_array::<f64>(4, PushFlags::NONE).unwrap();
        arena.slice_mut::<f64>(&b).unwrap()[3] = 2.5;
        assert_eq!(arena.slice::<f64>(&b).unwrap(), &[0.0, 0.0, 0.0, 2.5]);
    }

    #[test]
    fn typed_view_of_wrong_length_is_misaligned() {
        let mut arena = contiguous(mib(1), kib(64));
        let a = arena.push(6, 8, PushFlags::NONE).unwrap();
        assert!(matches!(
            arena.slice::<u32>(&a),
            Err(ArenaError::Misaligned { .. })
        ));
    }

    #[test]
    fn pop_to_rewinds_and_decommits() {
        let mut arena = contiguous(mib(1), kib(64));
        let mark = arena.offset();
        arena.push(kib(200), 1, PushFlags::NONE).unwrap();
        assert_eq!(arena.committed(), kib(256));
        arena.pop_to(mark);
        assert_eq!(arena.offset(), mark);
        assert_eq!(arena.committed(), kib(64));
    }

    #[test]
    fn pop_below_floor_clamps() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(100, 1, PushFlags::NONE).unwrap();
        arena.pop_to(0);
        assert_eq!(arena.offset(), 64);
    }

    #[test]
    #[should_panic(expected = "cannot rewind")]
    fn pop_forward_panics() {
        let mut arena = contiguous(mib(1), kib(64));
        let target = arena.offset() + 1;
        arena.pop_to(target);
    }

    #[test]
    fn pop_size_rewinds_by_bytes() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(100, 1, PushFlags::NONE).unwrap();
        arena.pop_size(40);
        assert_eq!(arena.offset(), 124);
    }

    #[test]
    #[should_panic(expected = "cannot pop")]
    fn pop_size_past_floor_panics() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(10, 1, PushFlags::NONE).unwrap();
        arena.pop_size(11);
    }

    #[test]
    fn chained_push_spills_into_new_block() {
        let mut arena = chained(mib(1), kib(64));
        assert_eq!(arena.mode(), ArenaMode::Chained);
        arena.push(kib(60), 1, PushFlags::NONE).unwrap();
        assert_eq!(arena.block_count(), 1);

        let a = arena.push(kib(8), 8, PushFlags::NONE).unwrap();
        assert_eq!(arena.block_count(), 2);
        assert_eq!(a.offset(), kib(64) + 64);
        assert_eq!(arena.committed(), kib(128));
        assert!(arena.bytes(&a).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn chained_header_grows_with_alignment() {
        let mut arena = chained(mib(1), kib(64));
        arena.push(kib(63), 1, PushFlags::NONE).unwrap();
        let a = arena.push(16, 4096, PushFlags::NONE).unwrap();
        assert_eq!(a.offset(), kib(64) + 4096);
        assert_eq!(arena.address(&a).unwrap() % 4096, 0);
    }

    #[test]
    fn chained_pop_releases_blocks() {
        let mut arena = chained(mib(1), kib(64));
        let mark = arena.offset();
        for _ in 0..5 {
            arena.push(kib(40), 8, PushFlags::NONE).unwrap();
        }
        assert_eq!(arena.block_count(), 5);
        arena.pop_to(mark);
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.committed(), kib(64));
        assert_eq!(arena.offset(), 64);
    }

    #[test]
    fn chained_pop_into_abandoned_tail_reuses_it() {
        let mut arena = chained(mib(1), kib(64));
        arena.push(kib(30), 1, PushFlags::NONE).unwrap();
        let mark = arena.offset();
        arena.push(kib(40), 1, PushFlags::NONE).unwrap();
        assert_eq!(arena.block_count(), 2);
        arena.pop_to(mark);
        assert_eq!(arena.block_count(), 1);
        let a = arena.push(kib(1), 1, PushFlags::NONE).unwrap();
        assert_eq!(a.offset(), mark);
    }

    #[test]
    fn chained_pop_into_block_header_lands_on_previous_end() {
        let mut arena = chained(mib(1), kib(64));
        arena.push(kib(60), 1, PushFlags::NONE).unwrap();
        arena.push(kib(8), 8, PushFlags::NONE).unwrap();
        assert_eq!(arena.block_count(), 2);

        arena.pop_size(kib(8) + 32);
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.offset(), kib(64));
        assert_eq!(arena.committed(), kib(64));

        let a = arena.push(16, 8, PushFlags::NONE).unwrap();
        assert_eq!(a.offset(), kib(64) + 64);
        assert_eq!(arena.block_count(), 2);
    }

    #[test]
    fn chained_never_commits_past_limit() {
        let mut arena = chained(kib(128), kib(48));
        while arena.push(kib(20), 1, PushFlags::NONE).is_ok() {}
        assert!(arena.committed() <= arena.limit());
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut arena = chained(mib(1), kib(64));
        arena.push(kib(100), 1, PushFlags::NONE).unwrap();
        arena.reset();
        assert_eq!(arena.offset(), 64);
        assert_eq!(arena.block_count(), 1);
    }

    #[test]
    fn foreign_and_stale_handles_are_rejected() {
        let mut a = contiguous(mib(1), kib(64));
        let b = contiguous(mib(1), kib(64));
        let mark = a.offset();
        let h = a.push(16, 1, PushFlags::NONE).unwrap();
        assert!(matches!(
            b.bytes(&h),
            Err(ArenaError::ForeignAllocation { .. })
        ));
        a.pop_to(mark);
        assert!(matches!(
            a.bytes(&h),
            Err(ArenaError::StaleAllocation { .. })
        ));
    }

    #[test]
    fn heap_backend_forces_chained() {
        let config = ArenaConfig::new(mib(1)).with_mode(ArenaMode::Contiguous);
        let arena = Arena::with_config(config, Arc::new(HeapMemory::new())).unwrap();
        assert_eq!(arena.mode(), ArenaMode::Chained);
    }

    #[test]
    fn zero_sized_push_is_valid() {
        let mut arena = contiguous(mib(1), kib(64));
        arena.push(3, 1, PushFlags::NONE).unwrap();
        let a = arena.push(0, 8, PushFlags::NONE).unwrap();
        assert_eq!(a.offset(), 72);
        assert_eq!(arena.offset(), 72);
        assert!(arena.bytes(&a).unwrap().is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn push_respects_alignment_and_limit(
                ops in prop::collection::vec((0usize..5000, 0u32..13), 1..40),
            ) {
                let mut arena = chained(kib(256), kib(16));
                let mut last_end = arena.offset();
                for (size, shift) in ops {
                    let align = 1usize << shift;
                    match arena.push(size, align, PushFlags::NONE) {
                        Ok(a) => {
                            prop_assert_eq!(a.offset() % align, 0);
                            prop_assert!(a.offset() >= last_end);
                            prop_assert!(a.end() <= arena.limit());
                            prop_assert_eq!(arena.address(&a).unwrap() % align, 0);
                            last_end = a.end();
                        }
                        Err(e) => prop_assert!(
                            matches!(e, ArenaError::CapacityExceeded { .. }),
                            "unexpected error {e}"
                        ),
                    }
                    prop_assert!(arena.committed() <= arena.limit());
                }
            }

            #[test]
            fn chained_rewind_to_any_offset_stays_consistent(
                sizes in prop::collection::vec(1usize..12_000, 1..20),
                back in 0usize..300_000,
            ) {
                let mut arena = chained(mib(1), kib(16));
                for size in sizes {
                    arena.push(size, 8, PushFlags::NONE).unwrap();
                }
                let target = arena.offset() - back.min(arena.used());
                arena.pop_to(target);
                prop_assert!(arena.offset() <= target);
                prop_assert!(arena.offset() + ArenaConfig::HEADER_RESERVE > target);
                prop_assert!(arena.offset() >= arena.floor());
                prop_assert!(arena.committed() <= arena.limit());

                let a = arena.push(16, 8, PushFlags::NONE).unwrap();
                prop_assert!(arena.bytes(&a).is_ok());
            }

            #[test]
            fn rewind_restores_offset(
                before in prop::collection::vec(0usize..3000, 0..10),
                after in prop::collection::vec(0usize..30000, 0..10),
            ) {
                let mut arena = contiguous(mib(1), kib(4));
                for size in before {
                    arena.push(size, 8, PushFlags::NONE).unwrap();
                }
                let mark = arena.offset();
                let committed = arena.committed();
                for size in after {
                    arena.push(size, 8, PushFlags::NONE).unwrap();
                }
                arena.pop_to(mark);
                prop_assert_eq!(arena.offset(), mark);
                prop_assert!(arena.committed() <= committed.max(arena.commit_size()));
            }
        }
    }
}
