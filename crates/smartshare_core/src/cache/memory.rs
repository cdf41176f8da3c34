//! In-process device cache.
//!
//! # Responsibility
//! - Hold cached cards and the tombstone set for tests and sessions that
//!   do not persist.
//!
//! # Invariants
//! - With a capacity set, only writes of new ids can fail; overwrites
//!   always succeed.
//! - Tombstones are insert-only, same as the persistent cache.

use crate::cache::{CacheError, CacheResult, LocalCardCache};
use crate::model::card::{Card, CardId};
use crate::sync::tombstones::TombstoneSet;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Map-backed cache for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCardCache {
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    cards: BTreeMap<CardId, Card>,
    tombstones: TombstoneSet,
    capacity: Option<usize>,
}

impl MemoryCardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `capacity` cards.
    ///
    /// Writing a new card beyond capacity fails with `QuotaExceeded`;
    /// overwriting an existing entry always succeeds.
    pub fn with_capacity(capacity: usize) -> Self {
        let cache = Self::default();
        cache.lock().capacity = Some(capacity);
        cache
    }

    pub fn len(&self) -> usize {
        self.lock().cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().cards.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalCardCache for MemoryCardCache {
    fn try_put(&self, card: &Card) -> CacheResult<()> {
        let mut state = self.lock();
        if let Some(capacity) = state.capacity {
            if !state.cards.contains_key(&card.id) && state.cards.len() >= capacity {
                return Err(CacheError::QuotaExceeded);
            }
        }
        state.cards.insert(card.id.clone(), card.clone());
        Ok(())
    }

    fn get(&self, id: &CardId) -> Option<Card> {
        self.lock().cards.get(id).cloned()
    }

    fn remove(&self, id: &CardId) {
        self.lock().cards.remove(id);
    }

    fn cached_cards(&self) -> Vec<Card> {
        self.lock().cards.values().cloned().collect()
    }

    fn tombstones(&self) -> TombstoneSet {
        self.lock().tombstones.clone()
    }

    fn add_tombstone(&self, id: &CardId) {
        self.lock().tombstones.insert(id.clone());
    }
}
