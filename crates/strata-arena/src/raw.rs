//! Owned virtual-memory backing and the only byte-level `unsafe` in the
//! arena.
//!
//! A [`Backing`] pairs one reserved [`Region`] with the backend that
//! produced it and tracks the committed prefix. Every byte view it hands
//! out is bounds-checked against that prefix, and decommit needs
//! `&mut self`, so no view can outlive the pages behind it. Dropping a
//! `Backing` releases the reservation.

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use strata_core::MemoryError;
use strata_os::{Region, VirtualMemory};

/// One reservation with a committed prefix `0..committed`.
pub(crate) struct Backing {
    memory: Arc<dyn VirtualMemory>,
    region: Option<Region>,
    committed: usize,
}

impl Backing {
    /// Reserve `len` bytes of address space on `memory`. Nothing is
    /// committed yet.
    pub(crate) fn reserve(memory: Arc<dyn VirtualMemory>, len: usize) -> Result<Self, MemoryError> {
        let region = memory.reserve(len)?;
        Ok(Self {
            memory,
            region: Some(region),
            committed: 0,
        })
    }

    fn region(&self) -> &Region {
        match &self.region {
            Some(region) => region,
            None => unreachable!("backing used after release"),
        }
    }

    /// Reserved length in bytes.
    pub(crate) fn reserved(&self) -> usize {
        self.region().len()
    }

    /// Length of the committed prefix.
    pub(crate) fn committed(&self) -> usize {
        self.committed
    }

    /// Grow the committed prefix to `target` bytes.
    ///
    /// On failure the prefix is unchanged.
    pub(crate) fn commit_to(&mut self, target: usize) -> Result<(), MemoryError> {
        if target <= self.committed {
            return Ok(());
        }
        let region = self.region();
        if target > region.len() {
            return Err(MemoryError::OutOfRange {
                offset: self.committed,
                len: target - self.committed,
                region_len: region.len(),
            });
        }
        // SAFETY: the region came from `self.memory` and is still reserved.
        unsafe {
            self.memory
                .commit(region, self.committed, target - self.committed)?;
        }
        self.committed = target;
        Ok(())
    }

    /// Shrink the committed prefix to `target` bytes.
    pub(crate) fn decommit_to(&mut self, target: usize) {
        if target >= self.committed {
            return;
        }
        // SAFETY: the region came from `self.memory`, and `&mut self`
        // guarantees no byte view into it is alive.
        unsafe {
            self.memory
                .decommit(self.region(), target, self.committed - target);
        }
        self.committed = target;
    }

    /// Pointer to `offset`, after checking `offset..offset + len` lies in
    /// the committed prefix.
    fn committed_ptr(&self, offset: usize, len: usize) -> NonNull<u8> {
        let in_bounds = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.committed);
        assert!(
            in_bounds,
            "range {offset}+{len} outside committed prefix of {} bytes",
            self.committed
        );
        // SAFETY: offset <= committed <= region length, so the pointer stays
        // within (or one past) the reservation.
        unsafe { self.region().as_ptr().add(offset) }
    }

    /// Shared view of committed bytes.
    ///
    /// # Panics
    ///
    /// Panics if the range is not fully committed.
    pub(crate) fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        let ptr = self.committed_ptr(offset, len);
        // SAFETY: the range is committed, hence readable, and stays so while
        // `&self` is borrowed because decommit and release need `&mut self`
        // or ownership. Committed memory is always initialised: fresh pages
        // read as zero.
        unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) }
    }

    /// Exclusive view of committed bytes.
    ///
    /// # Panics
    ///
    /// Panics if the range is not fully committed.
    pub(crate) fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        let ptr = self.committed_ptr(offset, len);
        // SAFETY: as for `bytes`; `&mut self` makes the view unique.
        unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) }
    }

    /// Address of byte `offset`, for alignment checks and diagnostics.
    pub(crate) fn address(&self, offset: usize) -> usize {
        self.region().as_ptr().as_ptr() as usize + offset
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            // SAFETY: the region came from `self.memory`; we own the only
            // handle to it and no view can outlive `self`.
            unsafe { self.memory.release(region) };
        }
    }
}

impl fmt::Debug for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backing")
            .field("region", &self.region)
            .field("committed", &self.committed)
            .finish()
    }
}
