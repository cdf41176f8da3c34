//! Card list reconciler.
//!
//! # Responsibility
//! - Keep the published card list, the device cache and the remote store
//!   eventually consistent for one owner.
//! - Run the delete flow: optimistic removal, remote delete, and the
//!   user-directed hide-or-abandon decision on failure.
//!
//! # Invariants
//! - A tombstoned id never appears in a published view.
//! - Loads publish full replacements ordered by request sequence; a load
//!   that started before a newer publish cannot overwrite it.
//! - A load never writes back to the cache a card that a delete or hide
//!   removed after the load began.
//! - No adapter failure escapes this boundary as an error; callers get
//!   reports and outcomes.

use crate::cache::LocalCardCache;
use crate::model::card::{Card, CardId, OwnerId};
use crate::model::view::CardViewEntry;
use crate::remote::{RemoteCardStore, RemoteError};
use crate::sync::view_state::{PublishStatus, ViewState};
use log::{info, warn};
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

/// Where a load took its cards from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    /// Remote unreachable; cards came from the device cache only.
    Degraded,
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub sequence: u64,
    pub source: LoadSource,
    /// The list this cycle computed (published only if `publish` is `Applied`).
    pub entries: Vec<CardViewEntry>,
    /// Remote cards dropped because their id is tombstoned.
    pub suppressed: usize,
    pub publish: PublishStatus,
}

/// How a failed delete should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteFailureKind {
    PermissionDenied,
    /// Network, not-found, or any other store failure.
    Transient,
}

/// A remote delete that failed and awaits the user's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    card_id: CardId,
    kind: DeleteFailureKind,
    error: RemoteError,
}

impl DeleteFailure {
    fn new(card_id: CardId, error: RemoteError) -> Self {
        let kind = if error.is_permission_denied() {
            DeleteFailureKind::PermissionDenied
        } else {
            DeleteFailureKind::Transient
        };
        Self {
            card_id,
            kind,
            error,
        }
    }

    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn kind(&self) -> DeleteFailureKind {
        self.kind
    }

    pub fn error(&self) -> &RemoteError {
        &self.error
    }

    /// Prompt text offering the hide-locally choice.
    pub fn message(&self) -> String {
        match self.kind {
            DeleteFailureKind::PermissionDenied => {
                "You don't have permission to delete this card from the cloud. \
                 Hide it on this device instead?"
                    .to_string()
            }
            DeleteFailureKind::Transient => format!(
                "The card could not be deleted from the cloud ({}). \
                 Hide it on this device instead?",
                self.error.code
            ),
        }
    }
}

/// Outcome of `CardReconciler::delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(CardId),
    NeedsDecision(DeleteFailure),
}

/// User decision after a failed delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResolution {
    /// Tombstone the id and drop it from the cache.
    HideLocally,
    /// Discard the optimistic removal by reloading authoritative state.
    Abandon,
}

/// Outcome of `CardReconciler::resolve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Hidden {
        card_id: CardId,
        publish: PublishStatus,
    },
    Reloaded(LoadReport),
}

/// Reconciles one owner's cards across remote store, device cache and view.
pub struct CardReconciler<R, C> {
    owner_id: OwnerId,
    remote: R,
    cache: C,
    view: Arc<ViewState>,
}

impl<R: RemoteCardStore, C: LocalCardCache> CardReconciler<R, C> {
    pub fn new(owner_id: OwnerId, remote: R, cache: C) -> Self {
        Self {
            owner_id,
            remote,
            cache,
            view: Arc::new(ViewState::new()),
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    /// Shared handle to the published view; `close()` it when the
    /// consumer goes away.
    pub fn view(&self) -> Arc<ViewState> {
        Arc::clone(&self.view)
    }

    pub fn current_view(&self) -> Vec<CardViewEntry> {
        self.view.snapshot()
    }

    /// Ids hidden on this device, ascending.
    pub fn hidden_card_ids(&self) -> Vec<CardId> {
        self.cache.tombstones().to_vec()
    }

    /// Runs one Fetch, Filter, Project, Mirror, Publish cycle.
    pub fn load(&self) -> LoadReport {
        let sequence = self.view.begin();
        let started_at = Instant::now();
        info!("event=cards_load module=sync status=start sequence={sequence}");

        let remote_cards = match self.remote.list_cards_for_owner(&self.owner_id) {
            Ok(cards) => cards,
            Err(err) => return self.load_degraded(sequence, started_at, &err),
        };

        let tombstones = self.cache.tombstones();
        let (visible, suppressed) = tombstones.retain_visible(remote_cards);
        let (visible, skipped) = self
            .view
            .mirror_since(sequence, visible, |card| self.cache.put(card));
        if skipped > 0 {
            info!(
                "event=cards_mirror module=sync status=skip sequence={sequence} removed_since_start={skipped}"
            );
        }
        let entries = project_sorted(visible);
        let publish = self.view.publish(sequence, entries.clone());

        info!(
            "event=cards_load module=sync status=ok source=remote sequence={} count={} suppressed={} publish={:?} duration_ms={}",
            sequence,
            entries.len(),
            suppressed,
            publish,
            started_at.elapsed().as_millis()
        );
        LoadReport {
            sequence,
            source: LoadSource::Remote,
            entries,
            suppressed,
            publish,
        }
    }

    /// Manual refresh; identical to a load.
    pub fn refresh(&self) -> LoadReport {
        self.load()
    }

    /// Deletes `id`, removing it from the view before the remote call.
    pub fn delete(&self, id: &CardId) -> DeleteOutcome {
        let sequence = self.view.begin();
        self.view.replace_with(sequence, |current| without_card(current, id));

        match self.remote.delete_card(id) {
            Ok(()) => {
                // Loads that began before this point may have fetched the card.
                let confirmed = self.view.begin();
                self.view
                    .record_removal(confirmed, id, || self.cache.remove(id));
                info!("event=card_delete module=sync status=ok card_id={id}");
                DeleteOutcome::Deleted(id.clone())
            }
            Err(err) => {
                let failure = DeleteFailure::new(id.clone(), err);
                warn!(
                    "event=card_delete module=sync status=error card_id={} error_code={} kind={:?}",
                    id,
                    failure.error().code,
                    failure.kind()
                );
                DeleteOutcome::NeedsDecision(failure)
            }
        }
    }

    /// Applies the user's decision for a failed delete.
    pub fn resolve(&self, failure: DeleteFailure, resolution: DeleteResolution) -> ResolveOutcome {
        match resolution {
            DeleteResolution::HideLocally => {
                let card_id = failure.card_id;
                self.cache.add_tombstone(&card_id);
                let sequence = self.view.begin();
                self.view
                    .record_removal(sequence, &card_id, || self.cache.remove(&card_id));

                // A load may have republished the id between the optimistic
                // removal and this decision.
                let tombstones = self.cache.tombstones();
                let publish = self.view.replace_with(sequence, |current| {
                    current
                        .iter()
                        .filter(|entry| !tombstones.contains(entry.card_id()))
                        .cloned()
                        .collect()
                });
                info!("event=card_hide module=sync status=ok card_id={card_id}");
                ResolveOutcome::Hidden { card_id, publish }
            }
            DeleteResolution::Abandon => {
                info!(
                    "event=card_delete_abandon module=sync status=ok card_id={}",
                    failure.card_id
                );
                ResolveOutcome::Reloaded(self.load())
            }
        }
    }

    fn load_degraded(&self, sequence: u64, started_at: Instant, err: &RemoteError) -> LoadReport {
        let entries = project_sorted(self.cache.cached_cards());
        let publish = self.view.publish(sequence, entries.clone());
        warn!(
            "event=cards_load module=sync status=degraded source=cache sequence={} count={} publish={:?} error_code={} duration_ms={}",
            sequence,
            entries.len(),
            publish,
            err.code,
            started_at.elapsed().as_millis()
        );
        LoadReport {
            sequence,
            source: LoadSource::Degraded,
            entries,
            suppressed: 0,
            publish,
        }
    }
}

/// Projects cards sorted by `updated_at DESC, id ASC`.
fn project_sorted(mut cards: Vec<Card>) -> Vec<CardViewEntry> {
    cards.sort_by(|a, b| {
        Reverse(a.updated_at)
            .cmp(&Reverse(b.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    cards.into_iter().map(CardViewEntry::project).collect()
}

fn without_card(current: &[CardViewEntry], id: &CardId) -> Vec<CardViewEntry> {
    current
        .iter()
        .filter(|entry| entry.card_id() != id)
        .cloned()
        .collect()
}
