//! Full-commit fallback backend on top of the global allocator.
//!
//! For hosts without userspace reserve/commit semantics. Reserving
//! allocates and zeroes the whole range immediately, commit and decommit
//! do nothing, and release frees. Because a reservation cannot be grown
//! in place, arenas on this backend always run in chained mode.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use strata_core::MemoryError;

use crate::region::Region;
use crate::VirtualMemory;

/// Alignment and granularity of heap-backed reservations.
const HEAP_PAGE_SIZE: usize = 4096;

/// [`VirtualMemory`] backend that carves reservations out of the global
/// allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapMemory;

impl HeapMemory {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }

    fn layout(len: usize) -> Result<Layout, MemoryError> {
        Layout::from_size_align(len, HEAP_PAGE_SIZE).map_err(|_| MemoryError::ReserveFailed {
            len,
            os_code: None,
        })
    }
}

// SAFETY: the whole reservation is allocated (and thus readable and
// writable) from `reserve` until `release`, and the layout aligns the base
// to HEAP_PAGE_SIZE.
unsafe impl VirtualMemory for HeapMemory {
    fn page_size(&self) -> usize {
        HEAP_PAGE_SIZE
    }

    fn supports_partial_commit(&self) -> bool {
        false
    }

    fn reserve(&self, len: usize) -> Result<Region, MemoryError> {
        if len == 0 {
            return Err(MemoryError::ReserveFailed { len, os_code: None });
        }
        let layout = Self::layout(len)?;
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        match NonNull::new(ptr) {
            // SAFETY: fresh allocation of exactly `len` bytes, owned by the region.
            Some(base) => Ok(unsafe { Region::from_raw_parts(base, len) }),
            None => {
                tracing::warn!(len, "heap reservation failed");
                Err(MemoryError::ReserveFailed { len, os_code: None })
            }
        }
    }

    unsafe fn commit(
        &self,
        region: &Region,
        offset: usize,
        len: usize,
    ) -> Result<(), MemoryError> {
        region.subrange(offset, len).map(|_| ())
    }

    unsafe fn decommit(&self, _region: &Region, _offset: usize, _len: usize) {}

    unsafe fn release(&self, region: Region) {
        if let Ok(layout) = Self::layout(region.len()) {
            // SAFETY: the caller guarantees the region came from `reserve`,
            // which allocated it with this exact layout.
            unsafe { alloc::dealloc(region.as_ptr().as_ptr(), layout) };
        }
    }
}
