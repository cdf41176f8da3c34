//! Card editor use-case service.
//!
//! # Responsibility
//! - Create drafts, open cards for editing, and save them.
//! - Build share URLs for saved cards.
//!
//! # Invariants
//! - Saves write the device cache before the remote store; a remote failure
//!   leaves the local copy in place.
//! - Saves are full overwrites keyed by `card.id`.

use crate::cache::{CacheError, LocalCardCache};
use crate::config::ShareConfig;
use crate::model::card::{Card, CardId, CardValidationError};
use crate::model::view::public_card_url;
use crate::remote::{RemoteCardStore, RemoteError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for editor use-cases.
#[derive(Debug)]
pub enum CardServiceError {
    Validation(CardValidationError),
    /// The local write failed; nothing reached the remote store.
    LocalStorage(CacheError),
    /// The remote write failed; the local copy was kept.
    Remote(RemoteError),
    NotFound(CardId),
}

impl Display for CardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::LocalStorage(err) => write!(f, "failed to save card locally: {err}"),
            Self::Remote(err) => write!(f, "saved locally but cloud save failed: {err}"),
            Self::NotFound(id) => write!(f, "card not found: {id}"),
        }
    }
}

impl Error for CardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::LocalStorage(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<CardValidationError> for CardServiceError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Editor facade over the remote store and device cache.
pub struct CardService<R, C> {
    remote: R,
    cache: C,
    share: ShareConfig,
}

impl<R: RemoteCardStore, C: LocalCardCache> CardService<R, C> {
    pub fn new(remote: R, cache: C, share: ShareConfig) -> Self {
        Self {
            remote,
            cache,
            share,
        }
    }

    /// Returns an empty card with a fresh id. Nothing is persisted.
    pub fn new_draft(&self) -> Card {
        Card::draft()
    }

    /// Loads a card for editing, preferring the device copy.
    pub fn open_for_edit(&self, id: &CardId) -> Result<Card, CardServiceError> {
        if let Some(card) = self.cache.get(id) {
            return Ok(card);
        }
        match self.remote.get_card(id) {
            Ok(Some(card)) => {
                self.cache.put(&card);
                Ok(card)
            }
            Ok(None) => Err(CardServiceError::NotFound(id.clone())),
            Err(err) => Err(CardServiceError::Remote(err)),
        }
    }

    /// Saves `card` locally, then remotely; returns the stamped document.
    ///
    /// # Errors
    /// - `Validation` before anything is written.
    /// - `LocalStorage` when the device write fails (e.g. quota).
    /// - `Remote` when the cloud write fails after the local write.
    pub fn save_card(&self, card: &Card) -> Result<Card, CardServiceError> {
        card.validate()?;

        if let Err(err) = self.cache.try_put(card) {
            warn!(
                "event=card_save module=service status=error stage=local card_id={} error={}",
                card.id, err
            );
            return Err(CardServiceError::LocalStorage(err));
        }

        let saved = match self.remote.save_card(card) {
            Ok(saved) => saved,
            Err(err) => {
                warn!(
                    "event=card_save module=service status=error stage=remote card_id={} error_code={}",
                    card.id, err.code
                );
                return Err(CardServiceError::Remote(err));
            }
        };

        self.cache.put(&saved);
        info!(
            "event=card_save module=service status=ok card_id={} links={}",
            saved.id,
            saved.links.len()
        );
        Ok(saved)
    }

    /// Public link for `id`, used for QR codes and sharing.
    pub fn share_url(&self, id: &CardId) -> String {
        public_card_url(&self.share.public_base_url, id)
    }
}
