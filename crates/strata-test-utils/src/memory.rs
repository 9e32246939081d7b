//! Instrumented [`VirtualMemory`] backends.
//!
//! - [`CountingMemory`] forwards to an inner backend and tracks live
//!   reserved and committed bytes plus call counts.
//! - [`FaultyMemory`] forwards to an inner backend but fails reserve or
//!   commit deterministically after N successes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strata_core::MemoryError;
use strata_os::{Region, VirtualMemory};

/// Backend wrapper that keeps running totals of what it was asked to do.
pub struct CountingMemory {
    inner: Arc<dyn VirtualMemory>,
    reserved: AtomicUsize,
    /// Committed bytes per live region, keyed by base address.
    committed: Mutex<HashMap<usize, usize>>,
    reserves: AtomicUsize,
    commits: AtomicUsize,
    decommits: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingMemory {
    pub fn new(inner: Arc<dyn VirtualMemory>) -> Self {
        Self {
            inner,
            reserved: AtomicUsize::new(0),
            committed: Mutex::new(HashMap::new()),
            reserves: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            decommits: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Wrap the system backend.
    pub fn system() -> Arc<Self> {
        Arc::new(Self::new(strata_os::system()))
    }

    /// Wrap a fresh [`HeapMemory`](strata_os::HeapMemory), which forces
    /// arenas into chained mode.
    pub fn heap() -> Arc<Self> {
        Arc::new(Self::new(Arc::new(strata_os::HeapMemory::new())))
    }

    /// Bytes currently reserved and not yet released.
    pub fn live_reserved(&self) -> usize {
        self.reserved.load(Ordering::Relaxed)
    }

    /// Bytes committed through this backend and not yet decommitted or
    /// released. Counts what was asked for, not what the host holds.
    pub fn live_committed(&self) -> usize {
        self.commitments().values().sum()
    }

    fn commitments(&self) -> MutexGuard<'_, HashMap<usize, usize>> {
        self.committed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(region: &Region) -> usize {
        region.as_ptr().as_ptr() as usize
    }

    pub fn reserve_calls(&self) -> usize {
        self.reserves.load(Ordering::Relaxed)
    }

    pub fn commit_calls(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }

    pub fn decommit_calls(&self) -> usize {
        self.decommits.load(Ordering::Relaxed)
    }

    pub fn release_calls(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }
}

// SAFETY: every call is forwarded unchanged to `inner`, which upholds the
// contract; the counters do not affect behaviour.
unsafe impl VirtualMemory for CountingMemory {
    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn supports_partial_commit(&self) -> bool {
        self.inner.supports_partial_commit()
    }

    fn reserve(&self, len: usize) -> Result<Region, MemoryError> {
        let region = self.inner.reserve(len)?;
        self.reserves.fetch_add(1, Ordering::Relaxed);
        self.reserved.fetch_add(region.len(), Ordering::Relaxed);
        Ok(region)
    }

    unsafe fn commit(
        &self,
        region: &Region,
        offset: usize,
        len: usize,
    ) -> Result<(), MemoryError> {
        // SAFETY: forwarded contract.
        unsafe { self.inner.commit(region, offset, len)? };
        self.commits.fetch_add(1, Ordering::Relaxed);
        *self.commitments().entry(Self::key(region)).or_default() += len;
        Ok(())
    }

    unsafe fn decommit(&self, region: &Region, offset: usize, len: usize) {
        // SAFETY: forwarded contract.
        unsafe { self.inner.decommit(region, offset, len) };
        self.decommits.fetch_add(1, Ordering::Relaxed);
        if let Some(live) = self.commitments().get_mut(&Self::key(region)) {
            *live = live.saturating_sub(len);
        }
    }

    unsafe fn release(&self, region: Region) {
        self.commitments().remove(&Self::key(&region));
        self.reserved.fetch_sub(region.len(), Ordering::Relaxed);
        self.releases.fetch_add(1, Ordering::Relaxed);
        // SAFETY: forwarded contract.
        unsafe { self.inner.release(region) };
    }
}

/// Backend wrapper that fails after a fixed number of successful calls.
///
/// A limit of `usize::MAX` never fails. Limits can be changed at any time,
/// so a test can build an arena first and only then arm the failure.
pub struct FaultyMemory {
    inner: Arc<dyn VirtualMemory>,
    reserves_left: AtomicUsize,
    commits_left: AtomicUsize,
}

impl FaultyMemory {
    pub fn new(inner: Arc<dyn VirtualMemory>) -> Self {
        Self {
            inner,
            reserves_left: AtomicUsize::new(usize::MAX),
            commits_left: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn system() -> Arc<Self> {
        Arc::new(Self::new(strata_os::system()))
    }

    pub fn heap() -> Arc<Self> {
        Arc::new(Self::new(Arc::new(strata_os::HeapMemory::new())))
    }

    /// Allow `n` more successful reserves, then fail.
    pub fn fail_reserve_after(&self, n: usize) {
        self.reserves_left.store(n, Ordering::Relaxed);
    }

    /// Allow `n` more successful commits, then fail.
    pub fn fail_commit_after(&self, n: usize) {
        self.commits_left.store(n, Ordering::Relaxed);
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.fail_reserve_after(usize::MAX);
        self.fail_commit_after(usize::MAX);
    }

    fn take(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

// SAFETY: successful calls are forwarded unchanged to `inner`; injected
// failures report an error without touching the region.
unsafe impl VirtualMemory for FaultyMemory {
    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn supports_partial_commit(&self) -> bool {
        self.inner.supports_partial_commit()
    }

    fn reserve(&self, len: usize) -> Result<Region, MemoryError> {
        if !Self::take(&self.reserves_left) {
            return Err(MemoryError::ReserveFailed { len, os_code: None });
        }
        self.inner.reserve(len)
    }

    unsafe fn commit(
        &self,
        region: &Region,
        offset: usize,
        len: usize,
    ) -> Result<(), MemoryError> {
        if !Self::take(&self.commits_left) {
            return Err(MemoryError::CommitFailed {
                offset,
                len,
                os_code: None,
            });
        }
        // SAFETY: forwarded contract.
        unsafe { self.inner.commit(region, offset, len) }
    }

    unsafe fn decommit(&self, region: &Region, offset: usize, len: usize) {
        // SAFETY: forwarded contract.
        unsafe { self.inner.decommit(region, offset, len) }
    }

    unsafe fn release(&self, region: Region) {
        // SAFETY: forwarded contract.
        unsafe { self.inner.release(region) }
    }
}
