//! Scoped rewind guards.
//!
//! A [`Checkpoint`] records an arena's offset when it is taken and rewinds
//! the arena to it when dropped, so everything pushed through the guard
//! is reclaimed at scope exit. Checkpoints come from
//! [`Arena::checkpoint`] (borrowing a caller-owned arena) or from
//! [`ScratchPool::acquire`](crate::ScratchPool::acquire) (sharing a pool
//! slot with any other checkpoint on it).
//!
//! Pooled checkpoints on one slot form a stack: each borrows the slot's
//! arena only for the length of a single call or an [`ArenaMut`] guard,
//! and must be released in reverse order of acquisition.

use std::cell::{RefCell, RefMut};
use std::ops::{Deref, DerefMut};

use bytemuck::Pod;
use strata_core::{Allocation, ArenaError, ArenaId, PushFlags};

use crate::arena::Arena;

enum Target<'a> {
    Borrowed(&'a mut Arena),
    Pooled(&'a RefCell<Arena>),
}

/// An arena plus the offset it will be rewound to.
///
/// The common pushes are forwarded directly; everything else goes through
/// [`arena`](Self::arena). Nested checkpoints on the same arena must be
/// released in reverse order, which the borrow checker enforces for
/// [`Arena::checkpoint`].
pub struct Checkpoint<'a> {
    target: Target<'a>,
    id: ArenaId,
    saved: usize,
}

/// Exclusive access to a checkpoint's arena, held for as long as the
/// guard lives.
pub struct ArenaMut<'g>(Access<'g>);

enum Access<'g> {
    Borrowed(&'g mut Arena),
    Pooled(RefMut<'g, Arena>),
}

impl<'a> Checkpoint<'a> {
    pub(crate) fn borrowed(arena: &'a mut Arena) -> Self {
        let id = arena.id();
        let saved = arena.offset();
        Self {
            target: Target::Borrowed(arena),
            id,
            saved,
        }
    }

    pub(crate) fn pooled(cell: &'a RefCell<Arena>, id: ArenaId, saved: usize) -> Self {
        Self {
            target: Target::Pooled(cell),
            id,
            saved,
        }
    }

    /// Offset the arena is rewound to on release.
    pub fn saved_offset(&self) -> usize {
        self.saved
    }

    /// Identifier of the underlying arena, for excluding it from later
    /// scratch acquisitions.
    pub fn arena_id(&self) -> ArenaId {
        self.id
    }

    /// The arena's current offset.
    ///
    /// # Panics
    ///
    /// Panics if the arena is held by an open [`ArenaMut`].
    pub fn offset(&self) -> usize {
        match &self.target {
            Target::Borrowed(arena) => arena.offset(),
            Target::Pooled(cell) => cell.borrow().offset(),
        }
    }

    /// Open the underlying arena.
    ///
    /// # Panics
    ///
    /// Panics if another checkpoint on the same pool slot has an open
    /// [`ArenaMut`].
    pub fn arena(&mut self) -> ArenaMut<'_> {
        match &mut self.target {
            Target::Borrowed(arena) => ArenaMut(Access::Borrowed(&mut **arena)),
            Target::Pooled(cell) => ArenaMut(Access::Pooled(cell.borrow_mut())),
        }
    }

    /// A nested checkpoint on the same arena.
    pub fn checkpoint(&mut self) -> Checkpoint<'_> {
        match &mut self.target {
            Target::Borrowed(arena) => Checkpoint::borrowed(&mut **arena),
            Target::Pooled(cell) => {
                let saved = cell.borrow().offset();
                Checkpoint::pooled(*cell, self.id, saved)
            }
        }
    }

    /// See [`Arena::push`].
    pub fn push(
        &mut self,
        size: usize,
        align: usize,
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        self.arena().push(size, align, flags)
    }

    /// See [`Arena::push_copy`].
    pub fn push_copy(
        &mut self,
        src: &[u8],
        align: usize,
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        self.arena().push_copy(src, align, flags)
    }

    /// See [`Arena::push_array`].
    pub fn push_array<T: Pod>(
        &mut self,
        count: usize,
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        self.arena().push_array::<T>(count, flags)
    }

    /// See [`Arena::push_copy_slice`].
    pub fn push_copy_slice<T: Pod>(
        &mut self,
        src: &[T],
        flags: PushFlags,
    ) -> Result<Allocation, ArenaError> {
        self.arena().push_copy_slice(src, flags)
    }

    /// Rewind the arena and give it back. Equivalent to dropping the guard.
    pub fn release(self) {}
}

fn rewind(arena: &mut Arena, saved: usize) {
    if arena.offset() >= saved {
        arena.pop_to(saved);
    } else {
        // Rewound past us already; nothing to reclaim.
        tracing::warn!(
            arena = %arena.id(),
            saved,
            offset = arena.offset(),
            "checkpoint released below its saved offset"
        );
    }
}

impl Drop for Checkpoint<'_> {
    fn drop(&mut self) {
        let saved = self.saved;
        match &mut self.target {
            Target::Borrowed(arena) => rewind(&mut **arena, saved),
            Target::Pooled(cell) => match cell.try_borrow_mut() {
                Ok(mut arena) => rewind(&mut arena, saved),
                Err(_) => tracing::warn!(
                    arena = %self.id,
                    saved,
                    "checkpoint released while its arena is open elsewhere"
                ),
            },
        }
    }
}

impl std::fmt::Debug for Checkpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let offset = match &self.target {
            Target::Borrowed(arena) => Some(arena.offset()),
            Target::Pooled(cell) => cell.try_borrow().ok().map(|arena| arena.offset()),
        };
        f.debug_struct("Checkpoint")
            .field("arena", &self.id)
            .field("saved", &self.saved)
            .field("offset", &offset)
            .finish()
    }
}

impl Deref for ArenaMut<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        match &self.0 {
            Access::Borrowed(arena) => &**arena,
            Access::Pooled(arena) => &**arena,
        }
    }
}

impl DerefMut for ArenaMut<'_> {
    fn deref_mut(&mut self) -> &mut Arena {
        match &mut self.0 {
            Access::Borrowed(arena) => &mut **arena,
            Access::Pooled(arena) => &mut **arena,
        }
    }
}

impl std::fmt::Debug for ArenaMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&**self, f)
    }
}
