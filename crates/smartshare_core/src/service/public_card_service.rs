//! Public card viewer and analytics service.
//!
//! # Invariants
//! - View counting is best-effort: increment failures are swallowed and
//!   never retried.

use crate::model::card::{Card, CardId};
use crate::model::view::CardStats;
use crate::remote::{RemoteCardStore, RemoteResult};
use log::debug;

pub struct PublicCardService<R> {
    remote: R,
}

impl<R: RemoteCardStore> PublicCardService<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    /// Fetches a card for a visitor and records the visit.
    ///
    /// Returns `Ok(None)` when the card does not exist.
    pub fn view_public_card(&self, id: &CardId) -> RemoteResult<Option<Card>> {
        let Some(card) = self.remote.get_card(id)? else {
            return Ok(None);
        };

        if let Err(err) = self.remote.increment_view_count(id) {
            debug!(
                "event=card_view_track module=service status=skipped card_id={} error_code={}",
                id, err.code
            );
        }
        Ok(Some(card))
    }

    /// Analytics figures from the current remote view count.
    pub fn card_stats(&self, id: &CardId) -> RemoteResult<Option<CardStats>> {
        let card = self.remote.get_card(id)?;
        Ok(card.map(|card| CardStats::from_views(card.view_count)))
    }
}
