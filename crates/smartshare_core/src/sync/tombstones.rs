//! Device-local tombstone set.
//!
//! # Responsibility
//! - Hold ids the device chose to hide after a failed remote delete.
//! - Encode/decode the persisted list stored under [`TOMBSTONE_KEY`].
//!
//! # Invariants
//! - Insert-only: no API removes an id once added.
//! - The set is never synced to the remote store.

use crate::model::card::{Card, CardId};
use log::warn;
use std::collections::BTreeSet;

/// Well-known local key holding the tombstone list. Owned by this module.
pub const TOMBSTONE_KEY: &str = "smartshare.deleted-cards";

/// Set of locally hidden card ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TombstoneSet {
    ids: BTreeSet<CardId>,
}

impl TombstoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.ids.contains(id)
    }

    /// Adds `id`; returns `false` when it was already present.
    pub fn insert(&mut self, id: CardId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardId> {
        self.ids.iter()
    }

    /// Returns ids in ascending order.
    pub fn to_vec(&self) -> Vec<CardId> {
        self.ids.iter().cloned().collect()
    }

    /// Drops every tombstoned card; returns survivors and suppressed count.
    pub fn retain_visible(&self, cards: Vec<Card>) -> (Vec<Card>, usize) {
        let before = cards.len();
        let visible: Vec<Card> = cards
            .into_iter()
            .filter(|card| !self.contains(&card.id))
            .collect();
        let suppressed = before - visible.len();
        (visible, suppressed)
    }

    /// Encodes as a JSON array of id strings.
    pub fn encode(&self) -> String {
        let raw: Vec<&str> = self.ids.iter().map(CardId::as_str).collect();
        serde_json::to_string(&raw).unwrap_or_else(|_| "[]".to_string())
    }

    /// Decodes a persisted JSON array.
    ///
    /// Malformed payloads decode to an empty set; invalid entries are
    /// skipped. Both cases are logged.
    pub fn decode(payload: &str) -> Self {
        match Self::try_decode(payload) {
            Ok(set) => set,
            Err(err) => {
                warn!(
                    "event=tombstones_decode module=sync status=error error_code=malformed_payload error={}",
                    err
                );
                Self::default()
            }
        }
    }

    /// Like [`TombstoneSet::decode`], but reports a malformed payload
    /// instead of returning an empty set.
    pub fn try_decode(payload: &str) -> Result<Self, serde_json::Error> {
        let raw: Vec<String> = serde_json::from_str(payload)?;
        let mut set = Self::default();
        for value in raw {
            match CardId::try_from(value) {
                Ok(id) => {
                    set.insert(id);
                }
                Err(err) => warn!(
                    "event=tombstones_decode module=sync status=skip error_code=invalid_id error={}",
                    err
                ),
            }
        }
        Ok(set)
    }
}

impl FromIterator<CardId> for TombstoneSet {
    fn from_iter<I: IntoIterator<Item = CardId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
