//! Scratch arenas for short-lived temporaries.
//!
//! A [`ScratchPool`] owns a fixed number of lazily created arenas. Callers
//! [`acquire`](ScratchPool::acquire) a [`Checkpoint`] on one of them, push
//! temporaries through it, and everything is reclaimed when the checkpoint
//! drops. Callers that are themselves building results in a scratch arena
//! pass its id in `excluding`, so nested work never rewinds over the
//! caller's live data.
//!
//! Each thread has a default pool reached through [`with_thread_pool`] and
//! [`with_scratch`]. Tests and embedders that need isolation construct
//! their own pool with an injected backend.

use std::cell::{OnceCell, RefCell};
use std::sync::Arc;

use strata_core::{ArenaError, ArenaId};
use strata_os::VirtualMemory;

use crate::arena::Arena;
use crate::checkpoint::Checkpoint;
use crate::config::{ArenaConfig, PoolConfig};

struct Slot {
    id: ArenaId,
    arena: RefCell<Arena>,
}

/// A fixed set of scratch arenas, scanned in slot order.
///
/// Several live checkpoints may share a slot; they stack, each rewinding
/// to the offset the slot had when it was acquired. Only `excluding`
/// keeps a caller's own scratch data out of reach. The pool is confined
/// to one thread.
pub struct ScratchPool {
    config: PoolConfig,
    memory: Arc<dyn VirtualMemory>,
    slots: Box<[OnceCell<Slot>]>,
}

impl ScratchPool {
    /// Create a pool. No arena is reserved until a slot is first visited.
    pub fn new(config: PoolConfig, memory: Arc<dyn VirtualMemory>) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self::unchecked(config, memory))
    }

    /// A pool with [`PoolConfig::default`] on `memory`.
    pub fn with_defaults(memory: Arc<dyn VirtualMemory>) -> Self {
        Self::unchecked(PoolConfig::default(), memory)
    }

    fn unchecked(config: PoolConfig, memory: Arc<dyn VirtualMemory>) -> Self {
        let slots = (0..config.slots).map(|_| OnceCell::new()).collect();
        Self {
            config,
            memory,
            slots,
        }
    }

    /// Number of slots.
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Ids of the slots created so far, in slot order.
    pub fn arena_ids(&self) -> Vec<ArenaId> {
        self.slots
            .iter()
            .filter_map(|cell| cell.get().map(|slot| slot.id))
            .collect()
    }

    /// Check out the first slot whose arena is not in `excluding`,
    /// creating its arena on first visit.
    ///
    /// A slot whose arena is open through an
    /// [`ArenaMut`](crate::checkpoint::ArenaMut) at the moment of the call
    /// is passed over, since its offset cannot be read.
    ///
    /// Fails with [`ScratchExhausted`](ArenaError::ScratchExhausted) when
    /// no slot qualifies and with [`Memory`](ArenaError::Memory) when a
    /// slot's arena cannot be created.
    pub fn acquire(&self, excluding: &[ArenaId]) -> Result<Checkpoint<'_>, ArenaError> {
        for (index, cell) in self.slots.iter().enumerate() {
            let slot = match cell.get() {
                Some(slot) => slot,
                None => {
                    let created = self.create_slot(index)?;
                    cell.get_or_init(|| created)
                }
            };
            if excluding.contains(&slot.id) {
                continue;
            }
            let Ok(saved) = slot.arena.try_borrow().map(|arena| arena.offset()) else {
                continue;
            };
            tracing::trace!(arena = %slot.id, slot = index, saved, "acquired scratch");
            return Ok(Checkpoint::pooled(&slot.arena, slot.id, saved));
        }
        Err(ArenaError::ScratchExhausted {
            slots: self.slots.len(),
        })
    }

    fn create_slot(&self, index: usize) -> Result<Slot, ArenaError> {
        let config = ArenaConfig::new(self.config.arena_limit);
        let arena = Arena::with_config(config, Arc::clone(&self.memory))?;
        tracing::debug!(arena = %arena.id(), slot = index, "created scratch arena");
        Ok(Slot {
            id: arena.id(),
            arena: RefCell::new(arena),
        })
    }
}

impl std::fmt::Debug for ScratchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchPool")
            .field("config", &self.config)
            .field("arenas", &self.arena_ids())
            .finish()
    }
}

thread_local! {
    static THREAD_POOL: ScratchPool = ScratchPool::with_defaults(strata_os::system());
}

/// Run `f` with this thread's default scratch pool.
pub fn with_thread_pool<R>(f: impl FnOnce(&ScratchPool) -> R) -> R {
    THREAD_POOL.with(f)
}

/// Acquire a scratch checkpoint from this thread's pool, avoiding the
/// arenas in `excluding`, and run `f` with it. The checkpoint is released
/// when `f` returns.
pub fn with_scratch<R>(
    excluding: &[ArenaId],
    f: impl FnOnce(&mut Checkpoint<'_>) -> R,
) -> Result<R, ArenaError> {
    with_thread_pool(|pool| {
        let mut scratch = pool.acquire(excluding)?;
        Ok(f(&mut scratch))
    })
}
