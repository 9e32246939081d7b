//! `mmap`-family primitives.

use std::io;
use std::ptr::{self, NonNull};

use strata_core::MemoryError;

use crate::region::Region;

pub(crate) fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

fn last_os_code() -> Option<i32> {
    io::Error::last_os_error().raw_os_error()
}

/// Reserve address space with no access rights. Pages only consume
/// physical memory once committed and touched.
pub(crate) fn reserve(len: usize) -> Result<Region, MemoryError> {
    // Private to our process and not backed by any file.
    let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

    // SAFETY: anonymous mapping at a kernel-chosen address; no existing
    // memory is affected.
    let addr = unsafe { libc::mmap(ptr::null_mut(), len, libc::PROT_NONE, flags, -1, 0) };
    if addr == libc::MAP_FAILED {
        let os_code = last_os_code();
        tracing::warn!(len, ?os_code, "mmap reserve failed");
        return Err(MemoryError::ReserveFailed { len, os_code });
    }
    match NonNull::new(addr.cast::<u8>()) {
        // SAFETY: fresh mapping of `len` bytes owned by nobody else.
        Some(base) => Ok(unsafe { Region::from_raw_parts(base, len) }),
        None => Err(MemoryError::ReserveFailed { len, os_code: None }),
    }
}

/// Make `ptr..ptr + len` readable and writable.
///
/// # Safety
///
/// The range must lie inside a mapping created by [`reserve`].
pub(crate) unsafe fn commit(ptr: NonNull<u8>, len: usize) -> Result<(), Option<i32>> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    // SAFETY: the caller guarantees the range is part of our mapping.
    let rc = unsafe { libc::mprotect(ptr.as_ptr().cast(), len, prot) };
    if rc == 0 {
        Ok(())
    } else {
        Err(last_os_code())
    }
}

/// Revoke access to `ptr..ptr + len` and let the kernel drop its pages.
///
/// # Safety
///
/// The range must lie inside a mapping created by [`reserve`], and no
/// live reference may point into it.
pub(crate) unsafe fn decommit(ptr: NonNull<u8>, len: usize) {
    // SAFETY: the caller guarantees the range is ours and unreferenced.
    unsafe {
        libc::mprotect(ptr.as_ptr().cast(), len, libc::PROT_NONE);
        libc::madvise(ptr.as_ptr().cast(), len, libc::MADV_DONTNEED);
    }
}

/// Unmap a whole reservation.
///
/// # Safety
///
/// `base..base + len` must be exactly a mapping created by [`reserve`].
pub(crate) unsafe fn release(base: NonNull<u8>, len: usize) {
    // SAFETY: the caller hands back a mapping we created.
    if unsafe { libc::munmap(base.as_ptr().cast(), len) } != 0 {
        tracing::warn!(len, os_code = ?last_os_code(), "munmap failed");
    }
}
