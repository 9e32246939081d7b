//! Virtual-memory primitives for the Strata arena allocator.
//!
//! The arena only needs four things from the host: reserve address space,
//! commit physical backing for part of it, decommit that backing again,
//! and release the whole reservation. [`VirtualMemory`] is that capability
//! as a trait, so the arena can run on the real OS ([`SystemMemory`]), on
//! hosts that can only commit a reservation all at once ([`HeapMemory`]),
//! or on instrumented backends in tests.
//!
//! This crate and `strata-arena`'s `raw` module are the only places that
//! contain `unsafe` code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

mod heap;
mod region;
mod system;

#[cfg(all(unix, not(miri)))]
mod unix;
#[cfg(all(windows, not(miri)))]
mod windows;

use std::sync::{Arc, OnceLock};

pub use heap::HeapMemory;
pub use region::Region;
pub use strata_core::MemoryError;
pub use system::SystemMemory;

/// Host virtual-memory capability.
///
/// Implementations hand out [`Region`]s from [`reserve`](Self::reserve)
/// and accept them back in the other calls. A region must only ever be
/// passed to the backend that reserved it.
///
/// # Safety
///
/// Implementors guarantee that after a successful `commit(region, off, len)`
/// the bytes `off..off + len` of the region are initialised and accessible
/// for reads and writes until they are decommitted or the region is
/// released, and that `reserve` returns a base aligned to at least
/// [`page_size`](Self::page_size).
pub unsafe trait VirtualMemory: Send + Sync {
    /// Granularity of commit/decommit operations, in bytes.
    fn page_size(&self) -> usize;

    /// Whether sub-ranges of a reservation can be committed independently.
    ///
    /// Backends returning `false` commit the whole reservation up front;
    /// arenas on such backends run in chained mode.
    fn supports_partial_commit(&self) -> bool;

    /// Reserve `len` bytes of address space without physical backing.
    fn reserve(&self, len: usize) -> Result<Region, MemoryError>;

    /// Commit physical backing for `offset..offset + len` of `region`.
    ///
    /// A partial success is reported as [`MemoryError::CommitFailed`].
    ///
    /// # Safety
    ///
    /// `region` must have been reserved by this backend and not released.
    unsafe fn commit(&self, region: &Region, offset: usize, len: usize)
        -> Result<(), MemoryError>;

    /// Drop physical backing for `offset..offset + len` of `region`,
    /// keeping the reservation.
    ///
    /// # Safety
    ///
    /// `region` must have been reserved by this backend, and no live
    /// reference may point into the range.
    unsafe fn decommit(&self, region: &Region, offset: usize, len: usize);

    /// Tear down backing and reservation for `region`.
    ///
    /// # Safety
    ///
    /// `region` must have been reserved by this backend, and no live
    /// reference may point into it.
    unsafe fn release(&self, region: Region);
}

/// The process-wide default backend: [`SystemMemory`].
pub fn system() -> Arc<dyn VirtualMemory> {
    static SHARED: OnceLock<Arc<dyn VirtualMemory>> = OnceLock::new();
    SHARED
        .get_or_init(|| Arc::new(SystemMemory::new()))
        .clone()
}
