//! Allocation handles.
//!
//! An [`Allocation`] names a byte range inside one arena. It carries no
//! pointer: bytes are reached through the owning arena's bounds-checked
//! accessors, which reject handles from other arenas and handles whose
//! range has been rewound away.

use std::fmt;
use std::ops::Range;

use crate::id::ArenaId;

/// A byte range handed out by an arena push.
///
/// `offset` is the global offset within the arena (across all blocks of
/// a chained arena), so two handles from the same arena can be ordered
/// and compared against a checkpoint's saved offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Allocation {
    arena: ArenaId,
    offset: usize,
    len: usize,
}

impl Allocation {
    /// Create a handle. Only arenas mint handles for their own ranges.
    #[doc(hidden)]
    pub fn new(arena: ArenaId, offset: usize, len: usize) -> Self {
        Self { arena, offset, len }
    }

    /// The arena that produced this handle.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Global offset of the first byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Global offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The covered global range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation(arena={}, off={}, len={})",
            self.arena, self.offset, self.len
        )
    }
}
