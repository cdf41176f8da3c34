//! Published card list container.
//!
//! # Responsibility
//! - Hold the card list currently shown to the owner.
//! - Order concurrent publishes by request sequence number.
//!
//! # Invariants
//! - Only full-view replacements are accepted, never partial patches.
//! - A publish tagged with a sequence lower than the last applied one is
//!   discarded.
//! - After `close()`, every publish is discarded.
//! - An id removed at sequence `n` is never mirrored by a load that began
//!   before `n`, whether or not the view is closed.

use crate::model::card::{Card, CardId};
use crate::model::view::CardViewEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Applied,
    /// A newer request already published.
    Stale,
    /// The consumer detached; nothing was written.
    Closed,
}

#[derive(Debug, Default)]
pub struct ViewState {
    next_sequence: AtomicU64,
    inner: Mutex<ViewInner>,
}

#[derive(Debug, Default)]
struct ViewInner {
    applied_sequence: u64,
    entries: Vec<CardViewEntry>,
    closed: bool,
    /// Latest sequence at which each id was removed by a delete or hide.
    removed_at: HashMap<CardId, u64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next request sequence number (starting at 1).
    pub fn begin(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replaces the view with `entries` if `sequence` is still current.
    pub fn publish(&self, sequence: u64, entries: Vec<CardViewEntry>) -> PublishStatus {
        self.replace_with(sequence, |_| entries)
    }

    /// Replaces the view with a list computed from the current one.
    ///
    /// `build` runs under the container lock, so the derived list cannot
    /// interleave with another publish.
    pub fn replace_with<F>(&self, sequence: u64, build: F) -> PublishStatus
    where
        F: FnOnce(&[CardViewEntry]) -> Vec<CardViewEntry>,
    {
        let mut inner = self.lock();
        if inner.closed {
            return PublishStatus::Closed;
        }
        if sequence < inner.applied_sequence {
            return PublishStatus::Stale;
        }
        let mut next = build(&inner.entries);
        next.retain(|entry| !inner.removed_after(entry.card_id(), sequence));
        inner.entries = next;
        inner.applied_sequence = sequence;
        PublishStatus::Applied
    }

    /// Records that `id` was removed at `sequence`, drops it from the
    /// current view and runs `on_remove` (the cache eviction), all under
    /// the container lock.
    pub fn record_removal<F>(&self, sequence: u64, id: &CardId, on_remove: F)
    where
        F: FnOnce(),
    {
        let mut inner = self.lock();
        let latest = inner.removed_at.entry(id.clone()).or_insert(sequence);
        *latest = (*latest).max(sequence);
        inner.entries.retain(|entry| entry.card_id() != id);
        on_remove();
    }

    /// Calls `write` for every card not removed after `sequence` began and
    /// returns those cards with the number skipped. Runs under the
    /// container lock.
    ///
    /// Runs regardless of `close()`, since mirroring outlives the consumer.
    pub fn mirror_since<F>(
        &self,
        sequence: u64,
        cards: Vec<Card>,
        mut write: F,
    ) -> (Vec<Card>, usize)
    where
        F: FnMut(&Card),
    {
        let inner = self.lock();
        let before = cards.len();
        let kept: Vec<Card> = cards
            .into_iter()
            .filter(|card| !inner.removed_after(&card.id, sequence))
            .collect();
        for card in &kept {
            write(card);
        }
        let skipped = before - kept.len();
        (kept, skipped)
    }

    pub fn snapshot(&self) -> Vec<CardViewEntry> {
        self.lock().entries.clone()
    }

    pub fn applied_sequence(&self) -> u64 {
        self.lock().applied_sequence
    }

    /// Detaches the consumer. Later publishes become no-ops.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, ViewInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ViewInner {
    fn removed_after(&self, id: &CardId, sequence: u64) -> bool {
        self.removed_at
            .get(id)
            .is_some_and(|removed| *removed > sequence)
    }
}
