//! Arena blocks: one reservation each, bump-allocated from a floor.
//!
//! A contiguous arena owns exactly one block whose committed prefix grows
//! and shrinks. A chained arena owns a stack of fully committed blocks;
//! the last one is current. Every block starts with a [`BlockHeader`]
//! inside its first [`ArenaConfig::HEADER_RESERVE`] bytes.

use bytemuck::{Pod, Zeroable};
use strata_core::{ArenaId, MemoryError};

use crate::config::ArenaConfig;
use crate::raw::Backing;

/// `b"STRATAB\x01"` read as a little-endian integer.
pub(crate) const BLOCK_MAGIC: u64 = u64::from_le_bytes(*b"STRATAB\x01");

/// Bookkeeping written at the start of every block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BlockHeader {
    pub(crate) magic: u64,
    pub(crate) arena: u64,
    /// Global offset of the block's first byte.
    pub(crate) base: u64,
    /// Reserved bytes in the block.
    pub(crate) capacity: u64,
    /// Local offset of the first user byte.
    pub(crate) floor: u64,
    _reserved: [u64; 3],
}

const _: () = assert!(std::mem::size_of::<BlockHeader>() == ArenaConfig::HEADER_RESERVE);

/// One reservation plus its bump cursor.
#[derive(Debug)]
pub(crate) struct Block {
    backing: Backing,
    /// Global offset of the block's first byte.
    base: usize,
    /// Local offset of the first user byte. At least `HEADER_RESERVE`.
    floor: usize,
    /// Local bump cursor.
    offset: usize,
}

impl Block {
    /// Wrap a backing whose first `floor` bytes are committed and stamp
    /// the header into them.
    pub(crate) fn new(mut backing: Backing, arena: ArenaId, base: usize, floor: usize) -> Self {
        debug_assert!(floor >= ArenaConfig::HEADER_RESERVE);
        let header = BlockHeader {
            magic: BLOCK_MAGIC,
            arena: arena.get(),
            base: base as u64,
            capacity: backing.reserved() as u64,
            floor: floor as u64,
            _reserved: [0; 3],
        };
        backing
            .bytes_mut(0, ArenaConfig::HEADER_RESERVE)
            .copy_from_slice(bytemuck::bytes_of(&header));
        Self {
            backing,
            base,
            floor,
            offset: floor,
        }
    }

    /// Read the header back out of the block.
    pub(crate) fn header(&self) -> BlockHeader {
        bytemuck::pod_read_unaligned(self.backing.bytes(0, ArenaConfig::HEADER_RESERVE))
    }

    pub(crate) fn base(&self) -> usize {
        self.base
    }

    pub(crate) fn floor(&self) -> usize {
        self.floor
    }

    /// Global offset of the first user byte.
    pub(crate) fn user_start(&self) -> usize {
        self.base + self.floor
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: usize) {
        debug_assert!(offset >= self.floor && offset <= self.backing.committed());
        self.offset = offset;
    }

    /// Reserved bytes.
    pub(crate) fn capacity(&self) -> usize {
        self.backing.reserved()
    }

    pub(crate) fn committed(&self) -> usize {
        self.backing.committed()
    }

    pub(crate) fn commit_to(&mut self, target: usize) -> Result<(), MemoryError> {
        self.backing.commit_to(target)
    }

    pub(crate) fn decommit_to(&mut self, target: usize) {
        self.backing.decommit_to(target)
    }

    pub(crate) fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        self.backing.bytes(offset, len)
    }

    pub(crate) fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        self.backing.bytes_mut(offset, len)
    }

    pub(crate) fn address(&self, offset: usize) -> usize {
        self.backing.address(offset)
    }
}
