//! Error types for the Strata allocator.
//!
//! Two layers: [`MemoryError`] reports what the host's virtual-memory
//! primitives refused, and [`ArenaError`] is what arena and scratch-pool
//! operations return. Contract violations (rewinding forward, popping more
//! than was pushed) are programming errors and panic instead.

use std::error::Error;
use std::fmt;

use crate::id::ArenaId;

/// Failures reported by a virtual-memory backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// The host refused to reserve address space.
    ReserveFailed {
        /// Number of bytes requested.
        len: usize,
        /// Raw OS error code, when the host reported one.
        os_code: Option<i32>,
    },
    /// The host refused to commit physical backing for a reserved range.
    ///
    /// Partial commits are reported as this error too; the caller must
    /// treat the whole range as uncommitted.
    CommitFailed {
        /// Offset of the range within its region.
        offset: usize,
        /// Length of the range.
        len: usize,
        /// Raw OS error code, when the host reported one.
        os_code: Option<i32>,
    },
    /// A sub-range operation fell outside the reserved region.
    OutOfRange {
        /// Offset of the requested range.
        offset: usize,
        /// Length of the requested range.
        len: usize,
        /// Length of the reserved region.
        region_len: usize,
    },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReserveFailed { len, os_code } => {
                write!(f, "failed to reserve {len} bytes of address space")?;
                if let Some(code) = os_code {
                    write!(f, " (os error {code})")?;
                }
                Ok(())
            }
            Self::CommitFailed {
                offset,
                len,
                os_code,
            } => {
                write!(f, "failed to commit {len} bytes at offset {offset}")?;
                if let Some(code) = os_code {
                    write!(f, " (os error {code})")?;
                }
                Ok(())
            }
            Self::OutOfRange {
                offset,
                len,
                region_len,
            } => {
                write!(
                    f,
                    "range {offset}+{len} outside reserved region of {region_len} bytes"
                )
            }
        }
    }
}

impl Error for MemoryError {}

/// Errors that can occur during arena and scratch-pool operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The push would move the high-water mark past the arena's limit.
    ///
    /// Deterministic: independent of host memory pressure.
    CapacityExceeded {
        /// Offset the push would have ended at.
        requested: usize,
        /// The arena's address-space limit.
        limit: usize,
    },
    /// The host refused address space or physical backing.
    Memory(MemoryError),
    /// Creation parameters were rejected.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// An allocation handle was presented to an arena that did not mint it.
    ForeignAllocation {
        /// The arena that was asked.
        expected: ArenaId,
        /// The arena named by the handle.
        found: ArenaId,
    },
    /// An allocation handle's range lies past the arena's current offset;
    /// it was rewound away.
    StaleAllocation {
        /// End offset of the handle's range.
        end: usize,
        /// Current high-water mark of the arena.
        offset: usize,
    },
    /// A typed view did not fit the allocation's size or alignment.
    Misaligned {
        /// Description of the mismatch.
        reason: String,
    },
    /// Every scratch slot was excluded or already checked out.
    ScratchExhausted {
        /// Number of slots in the pool.
        slots: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { requested, limit } => {
                write!(
                    f,
                    "arena capacity exceeded: push would end at {requested} bytes, limit {limit} bytes"
                )
            }
            Self::Memory(e) => write!(f, "virtual memory error: {e}"),
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::ForeignAllocation { expected, found } => {
                write!(f, "allocation belongs to arena {found}, not arena {expected}")
            }
            Self::StaleAllocation { end, offset } => {
                write!(
                    f,
                    "stale allocation: ends at {end} but arena offset is {offset}"
                )
            }
            Self::Misaligned { reason } => write!(f, "misaligned typed view: {reason}"),
            Self::ScratchExhausted { slots } => {
                write!(f, "no scratch arena available among {slots} slots")
            }
        }
    }
}

impl Error for ArenaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Memory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MemoryError> for ArenaError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}
