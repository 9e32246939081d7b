//! The host operating system's virtual-memory API.

use strata_core::MemoryError;

use crate::region::Region;
use crate::VirtualMemory;

#[cfg(all(unix, not(miri)))]
use crate::unix as os;
#[cfg(all(windows, not(miri)))]
use crate::windows as os;

/// [`VirtualMemory`] backend over the host's reserve/commit API.
///
/// - Unix: `mmap(PROT_NONE)` / `mprotect` / `madvise(MADV_DONTNEED)` / `munmap`
/// - Windows: `VirtualAlloc(MEM_RESERVE)` / `VirtualAlloc(MEM_COMMIT)` /
///   `VirtualFree(MEM_DECOMMIT)` / `VirtualFree(MEM_RELEASE)`
///
/// On other targets, and under Miri, it falls back to
/// [`HeapMemory`](crate::HeapMemory) and reports no partial-commit support.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemMemory;

impl SystemMemory {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(any(all(unix, not(miri)), all(windows, not(miri))))]
// SAFETY: delegates to the host API, which commits exactly the requested
// pages on success and returns page-aligned reservations.
unsafe impl VirtualMemory for SystemMemory {
    fn page_size(&self) -> usize {
        static PAGE_SIZE: std::sync::OnceLock<usize> = std::sync::OnceLock::new();
        *PAGE_SIZE.get_or_init(os::page_size)
    }

    fn supports_partial_commit(&self) -> bool {
        true
    }

    fn reserve(&self, len: usize) -> Result<Region, MemoryError> {
        if len == 0 {
            return Err(MemoryError::ReserveFailed { len, os_code: None });
        }
        let region = os::reserve(len)?;
        tracing::trace!(len, base = ?region.as_ptr(), "reserved address space");
        Ok(region)
    }

    unsafe fn commit(
        &self,
        region: &Region,
        offset: usize,
        len: usize,
    ) -> Result<(), MemoryError> {
        let ptr = region.subrange(offset, len)?;
        if len == 0 {
            return Ok(());
        }
        // SAFETY: the caller guarantees the region is ours; subrange checked bounds.
        unsafe { os::commit(ptr, len) }.map_err(|os_code| {
            tracing::warn!(offset, len, ?os_code, "commit failed");
            MemoryError::CommitFailed {
                offset,
                len,
                os_code,
            }
        })
    }

    unsafe fn decommit(&self, region: &Region, offset: usize, len: usize) {
        let Ok(ptr) = region.subrange(offset, len) else {
            debug_assert!(false, "decommit outside region");
            return;
        };
        if len != 0 {
            // SAFETY: as for commit; the caller guarantees no live references.
            unsafe { os::decommit(ptr, len) };
        }
    }

    unsafe fn release(&self, region: Region) {
        tracing::trace!(len = region.len(), base = ?region.as_ptr(), "releasing address space");
        // SAFETY: the caller hands back a region we reserved.
        unsafe { os::release(region.as_ptr(), region.len()) };
    }
}

#[cfg(not(any(all(unix, not(miri)), all(windows, not(miri)))))]
// SAFETY: forwards every call to HeapMemory, which upholds the contract.
unsafe impl VirtualMemory for SystemMemory {
    fn page_size(&self) -> usize {
        crate::HeapMemory.page_size()
    }

    fn supports_partial_commit(&self) -> bool {
        false
    }

    fn reserve(&self, len: usize) -> Result<Region, MemoryError> {
        crate::HeapMemory.reserve(len)
    }

    unsafe fn commit(
        &self,
        region: &Region,
        offset: usize,
        len: usize,
    ) -> Result<(), MemoryError> {
        // SAFETY: forwarded contract.
        unsafe { crate::HeapMemory.commit(region, offset, len) }
    }

    unsafe fn decommit(&self, region: &Region, offset: usize, len: usize) {
        // SAFETY: forwarded contract.
        unsafe { crate::HeapMemory.decommit(region, offset, len) }
    }

    unsafe fn release(&self, region: Region) {
        // SAFETY: forwarded contract.
        unsafe { crate::HeapMemory.release(region) }
    }
}
