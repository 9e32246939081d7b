//! `VirtualAlloc`-family primitives.

use std::io;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use strata_core::MemoryError;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS,
    PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use crate::region::Region;

pub(crate) fn page_size() -> usize {
    let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo fully initialises the struct it is handed.
    let info = unsafe {
        GetSystemInfo(info.as_mut_ptr());
        info.assume_init()
    };
    match info.dwPageSize as usize {
        0 => 4096,
        size => size,
    }
}

fn last_os_code() -> Option<i32> {
    io::Error::last_os_error().raw_os_error()
}

pub(crate) fn reserve(len: usize) -> Result<Region, MemoryError> {
    // SAFETY: a null address asks the system to pick the placement.
    let addr = unsafe { VirtualAlloc(ptr::null(), len, MEM_RESERVE, PAGE_NOACCESS) };
    match NonNull::new(addr.cast::<u8>()) {
        // SAFETY: fresh reservation of `len` bytes owned by nobody else.
        Some(base) => Ok(unsafe { Region::from_raw_parts(base, len) }),
        None => {
            let os_code = last_os_code();
            tracing::warn!(len, ?os_code, "VirtualAlloc reserve failed");
            Err(MemoryError::ReserveFailed { len, os_code })
        }
    }
}

/// # Safety
///
/// The range must lie inside a reservation created by [`reserve`].
pub(crate) unsafe fn commit(ptr: NonNull<u8>, len: usize) -> Result<(), Option<i32>> {
    // SAFETY: the caller guarantees the range is part of our reservation.
    let addr = unsafe { VirtualAlloc(ptr.as_ptr().cast(), len, MEM_COMMIT, PAGE_READWRITE) };
    if addr.is_null() {
        Err(last_os_code())
    } else {
        Ok(())
    }
}

/// # Safety
///
/// The range must lie inside a reservation created by [`reserve`], and no
/// live reference may point into it.
pub(crate) unsafe fn decommit(ptr: NonNull<u8>, len: usize) {
    // SAFETY: the caller guarantees the range is ours and unreferenced.
    unsafe { VirtualFree(ptr.as_ptr().cast(), len, MEM_DECOMMIT) };
}

/// # Safety
///
/// `base` must be the base of a reservation created by [`reserve`].
pub(crate) unsafe fn release(base: NonNull<u8>, len: usize) {
    // MEM_RELEASE requires a size of zero and frees the whole reservation.
    // SAFETY: the caller hands back a reservation we created.
    if unsafe { VirtualFree(base.as_ptr().cast(), 0, MEM_RELEASE) } == 0 {
        tracing::warn!(len, os_code = ?last_os_code(), "VirtualFree release failed");
    }
}
