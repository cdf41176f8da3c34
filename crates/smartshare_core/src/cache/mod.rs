//! Device-local card cache contract and implementations.
//!
//! # Responsibility
//! - Mirror cards for offline reads.
//! - Persist the device tombstone set next to cached cards.
//!
//! # Invariants
//! - Reconciler-facing operations never fail observably; implementations
//!   log and degrade.
//! - Only `try_put` surfaces write failures, for the editor save path.

use crate::db::DbError;
use crate::model::card::{Card, CardId};
use crate::sync::tombstones::TombstoneSet;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod memory;
mod sqlite;

pub use memory::MemoryCardCache;
pub use sqlite::{SqliteCardCache, TOMBSTONE_BACKUP_KEY};

/// Key prefix for cached card documents.
pub const CARD_KEY_PREFIX: &str = "card-";

pub type CacheResult<T> = Result<T, CacheError>;

/// Local cache write failure.
#[derive(Debug)]
pub enum CacheError {
    /// Storage is full.
    QuotaExceeded,
    Db(DbError),
    Encode(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "local storage quota exceeded"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode cached card: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::QuotaExceeded => None,
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Storage key for one cached card.
pub fn card_key(id: &CardId) -> String {
    format!("{CARD_KEY_PREFIX}{id}")
}

/// Keyed device storage for cards and tombstones.
pub trait LocalCardCache: Send + Sync {
    /// Writes `card`, overwriting any cached copy.
    fn try_put(&self, card: &Card) -> CacheResult<()>;
    fn get(&self, id: &CardId) -> Option<Card>;
    fn remove(&self, id: &CardId);
    /// Returns every cached card, sorted by id.
    fn cached_cards(&self) -> Vec<Card>;
    fn tombstones(&self) -> TombstoneSet;
    fn add_tombstone(&self, id: &CardId);

    /// Writes `card`; failures are logged and swallowed.
    fn put(&self, card: &Card) {
        if let Err(err) = self.try_put(card) {
            warn!(
                "event=cache_put module=cache status=degraded card_id={} error={}",
                card.id, err
            );
        }
    }
}

impl<T: LocalCardCache + ?Sized> LocalCardCache for Arc<T> {
    fn try_put(&self, card: &Card) -> CacheResult<()> {
        (**self).try_put(card)
    }

    fn get(&self, id: &CardId) -> Option<Card> {
        (**self).get(id)
    }

    fn remove(&self, id: &CardId) {
        (**self).remove(id)
    }

    fn cached_cards(&self) -> Vec<Card> {
        (**self).cached_cards()
    }

    fn tombstones(&self) -> TombstoneSet {
        (**self).tombstones()
    }

    fn add_tombstone(&self, id: &CardId) {
        (**self).add_tombstone(id)
    }
}
