//! Arena and scratch-pool configuration parameters.

use strata_core::align::{self, round_up};
use strata_core::size::{gib, kib, mib};
use strata_core::{ArenaError, ArenaMode};

/// Configuration for a single [`Arena`](crate::Arena).
///
/// All values are fixed at creation. Sizes are normalised by
/// [`Arena::with_config`](crate::Arena::with_config): the limit is
/// rounded up to a multiple of [`MIN_LIMIT`](Self::MIN_LIMIT) and the
/// commit size to a multiple of [`MIN_COMMIT_SIZE`](Self::MIN_COMMIT_SIZE)
/// (or the host page size if larger), then clamped to the limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Maximum total bytes the arena may ever hand out, headers included.
    pub limit: usize,

    /// Growth granularity.
    ///
    /// `None` picks [`DEFAULT_COMMIT_SIZE`](Self::DEFAULT_COMMIT_SIZE) for
    /// contiguous arenas and [`DEFAULT_BLOCK_SIZE`](Self::DEFAULT_BLOCK_SIZE)
    /// for chained ones.
    pub commit_size: Option<usize>,

    /// Operating mode.
    ///
    /// `None` picks contiguous when the backend supports partial commit
    /// and chained otherwise. Contiguous on a backend without partial
    /// commit is forced to chained.
    pub mode: Option<ArenaMode>,
}

impl ArenaConfig {
    /// Limits are rounded up to a multiple of this.
    pub const MIN_LIMIT: usize = kib(64);

    /// Commit sizes are rounded up to a multiple of this.
    pub const MIN_COMMIT_SIZE: usize = kib(4);

    /// Bytes at the start of every block reserved for its header.
    pub const HEADER_RESERVE: usize = 64;

    /// Largest honoured push alignment.
    pub const MAX_ALIGN: usize = align::MAX_ALIGN;

    /// Default commit granularity for contiguous arenas.
    pub const DEFAULT_COMMIT_SIZE: usize = kib(64);

    /// Default block size for chained arenas.
    pub const DEFAULT_BLOCK_SIZE: usize = mib(4);

    /// Config for an arena of `limit` bytes with every other value defaulted.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            commit_size: None,
            mode: None,
        }
    }

    /// Set the growth granularity.
    pub fn with_commit_size(mut self, commit_size: usize) -> Self {
        self.commit_size = Some(commit_size);
        self
    }

    /// Request an operating mode.
    pub fn with_mode(mut self, mode: ArenaMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Reject parameters no arena can be built from.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.limit == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "limit must be non-zero".into(),
            });
        }
        if self.commit_size == Some(0) {
            return Err(ArenaError::InvalidConfig {
                reason: "commit_size must be non-zero".into(),
            });
        }
        Ok(())
    }

    /// Resolve the effective `(mode, limit, commit_size)` for a backend
    /// with the given page size and partial-commit support.
    pub(crate) fn resolve(
        &self,
        page_size: usize,
        partial_commit: bool,
    ) -> Result<(ArenaMode, usize, usize), ArenaError> {
        self.validate()?;

        let mode = match (self.mode, partial_commit) {
            (Some(ArenaMode::Chained), _) | (_, false) => ArenaMode::Chained,
            (Some(ArenaMode::Contiguous), true) | (None, true) => ArenaMode::Contiguous,
        };
        if self.mode == Some(ArenaMode::Contiguous) && mode == ArenaMode::Chained {
            tracing::debug!("backend cannot commit partially; forcing chained mode");
        }

        let limit = round_up(self.limit, Self::MIN_LIMIT.max(page_size)).ok_or_else(|| {
            ArenaError::InvalidConfig {
                reason: format!("limit {} overflows when rounded up", self.limit),
            }
        })?;

        let requested = self.commit_size.unwrap_or(match mode {
            ArenaMode::Contiguous => Self::DEFAULT_COMMIT_SIZE,
            ArenaMode::Chained => Self::DEFAULT_BLOCK_SIZE,
        });
        let commit_size = round_up(requested, Self::MIN_COMMIT_SIZE.max(page_size))
            .ok_or_else(|| ArenaError::InvalidConfig {
                reason: format!("commit_size {requested} overflows when rounded up"),
            })?
            .min(limit);

        Ok((mode, limit, commit_size))
    }
}

/// Configuration for a [`ScratchPool`](crate::ScratchPool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of scratch arenas in the pool.
    pub slots: usize,
    /// Limit of each lazily created scratch arena.
    pub arena_limit: usize,
}

impl PoolConfig {
    /// Default slot count.
    pub const DEFAULT_SLOTS: usize = 2;

    /// Default per-slot arena limit.
    pub const DEFAULT_ARENA_LIMIT: usize = gib(1);

    /// Reject parameters no pool can be built from.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.slots == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "scratch pool needs at least one slot".into(),
            });
        }
        ArenaConfig::new(self.arena_limit).validate()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            slots: Self::DEFAULT_SLOTS,
            arena_limit: Self::DEFAULT_ARENA_LIMIT,
        }
    }
}
