//! Reserved address ranges.

use std::fmt;
use std::ptr::NonNull;

use strata_core::MemoryError;

/// One reserved range of address space.
///
/// A `Region` is a token: it owns the reservation but not the bytes, and
/// it does not release anything on drop. The backend that produced it
/// must be handed it back through `release`.
pub struct Region {
    base: NonNull<u8>,
    len: usize,
}

impl Region {
    /// Wrap a reservation produced by a backend.
    ///
    /// # Safety
    ///
    /// `base..base + len` must be a live reservation owned by the caller
    /// and not wrapped by any other `Region`.
    pub unsafe fn from_raw_parts(base: NonNull<u8>, len: usize) -> Self {
        Self { base, len }
    }

    /// First byte of the reservation.
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.base
    }

    /// Size of the reservation in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the reservation is empty. Backends never produce one.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounds-check `offset..offset + len` and return a pointer to its
    /// first byte.
    pub fn subrange(&self, offset: usize, len: usize) -> Result<NonNull<u8>, MemoryError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => {
                // SAFETY: offset <= self.len, so the result stays within
                // (or one past) the reservation and is non-null.
                Ok(unsafe { self.base.add(offset) })
            }
            _ => Err(MemoryError::OutOfRange {
                offset,
                len,
                region_len: self.len,
            }),
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}
