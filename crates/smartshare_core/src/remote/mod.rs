//! Remote document store contract.
//!
//! # Responsibility
//! - Define the operations the core needs from the cloud card store.
//! - Classify store failures by stable wire codes.
//!
//! # Invariants
//! - `save_card` is a full-document overwrite keyed by `card.id` that stamps
//!   `owner_id` from the current session and `updated_at` with the current
//!   time.
//! - `increment_view_count` is best-effort and may under-count under
//!   concurrent visits.

use crate::model::card::{Card, CardId, OwnerId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod memory;

pub use memory::InMemoryRemoteStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure classes reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoteErrorCode {
    PermissionDenied,
    NotFound,
    Unavailable,
    Unauthenticated,
    Other(String),
}

impl RemoteErrorCode {
    /// Maps a store wire code (e.g. `permission-denied`) to a code.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "permission-denied" => Self::PermissionDenied,
            "not-found" => Self::NotFound,
            "unavailable" => Self::Unavailable,
            "unauthenticated" => Self::Unauthenticated,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::Unavailable => "unavailable",
            Self::Unauthenticated => "unauthenticated",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl Display for RemoteErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by remote store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.code == RemoteErrorCode::PermissionDenied
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote store error `{}`: {}", self.code, self.message)
    }
}

impl Error for RemoteError {}

/// Cloud card store consumed by the reconciler and services.
pub trait RemoteCardStore: Send + Sync {
    /// Overwrites the document for `card.id` and returns the stamped copy.
    fn save_card(&self, card: &Card) -> RemoteResult<Card>;
    /// Point lookup without ownership filter.
    fn get_card(&self, id: &CardId) -> RemoteResult<Option<Card>>;
    /// Returns every card owned by `owner_id`, in no particular order.
    fn list_cards_for_owner(&self, owner_id: &OwnerId) -> RemoteResult<Vec<Card>>;
    fn delete_card(&self, id: &CardId) -> RemoteResult<()>;
    /// Read-then-write of `view_count + 1`; not atomic.
    fn increment_view_count(&self, id: &CardId) -> RemoteResult<()>;
}

impl<T: RemoteCardStore + ?Sized> RemoteCardStore for Arc<T> {
    fn save_card(&self, card: &Card) -> RemoteResult<Card> {
        (**self).save_card(card)
    }

    fn get_card(&self, id: &CardId) -> RemoteResult<Option<Card>> {
        (**self).get_card(id)
    }

    fn list_cards_for_owner(&self, owner_id: &OwnerId) -> RemoteResult<Vec<Card>> {
        (**self).list_cards_for_owner(owner_id)
    }

    fn delete_card(&self, id: &CardId) -> RemoteResult<()> {
        (**self).delete_card(id)
    }

    fn increment_view_count(&self, id: &CardId) -> RemoteResult<()> {
        (**self).increment_view_count(id)
    }
}
