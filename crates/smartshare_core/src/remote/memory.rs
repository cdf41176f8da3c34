//! In-process remote card store.
//!
//! # Responsibility
//! - Stand in for the hosted document store in tests and offline demos.
//! - Let callers inject outages, sign-outs and per-card failures.
//!
//! # Invariants
//! - Saves require a session and stamp `owner_id` and `updated_at`.
//! - A save never overwrites a card owned by another account.
//! - While offline, every operation fails with `unavailable`.

use crate::model::card::{Card, CardId, OwnerId};
use crate::remote::{RemoteCardStore, RemoteError, RemoteErrorCode, RemoteResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// In-process document store for tests and offline demos.
///
/// Behaves like the hosted store: delete of a missing document succeeds,
/// view increments on missing documents are no-ops. Failure knobs let
/// callers simulate outages and rule denials.
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<CardId, Card>,
    session: Option<OwnerId>,
    offline: bool,
    delete_failures: HashMap<CardId, RemoteErrorCode>,
    save_failures: HashMap<CardId, RemoteErrorCode>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `owner` signed in.
    pub fn with_session(owner: OwnerId) -> Self {
        let store = Self::default();
        store.sign_in(owner);
        store
    }

    pub fn sign_in(&self, owner: OwnerId) {
        self.lock().session = Some(owner);
    }

    pub fn sign_out(&self) {
        self.lock().session = None;
    }

    /// Stores a document as-is, bypassing session stamping.
    pub fn insert_document(&self, card: Card) {
        self.lock().documents.insert(card.id.clone(), card);
    }

    pub fn document(&self, id: &CardId) -> Option<Card> {
        self.lock().documents.get(id).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    /// Makes every operation fail with `unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Makes `delete_card(id)` fail with `code` until cleared.
    pub fn fail_deletes_with(&self, id: CardId, code: RemoteErrorCode) {
        self.lock().delete_failures.insert(id, code);
    }

    pub fn clear_delete_failure(&self, id: &CardId) {
        self.lock().delete_failures.remove(id);
    }

    /// Makes `save_card` for `id` fail with `code` until cleared.
    pub fn fail_saves_with(&self, id: CardId, code: RemoteErrorCode) {
        self.lock().save_failures.insert(id, code);
    }

    pub fn clear_save_failure(&self, id: &CardId) {
        self.lock().save_failures.remove(id);
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_online(&self) -> RemoteResult<MutexGuard<'_, StoreState>> {
        let state = self.lock();
        if state.offline {
            return Err(RemoteError::new(
                RemoteErrorCode::Unavailable,
                "store is unreachable",
            ));
        }
        Ok(state)
    }
}

impl RemoteCardStore for InMemoryRemoteStore {
    fn save_card(&self, card: &Card) -> RemoteResult<Card> {
        let mut state = self.lock_online()?;
        if let Some(code) = state.save_failures.get(&card.id) {
            return Err(RemoteError::new(code.clone(), "save rejected"));
        }
        let owner = state.session.clone().ok_or_else(|| {
            RemoteError::new(RemoteErrorCode::Unauthenticated, "no signed-in session")
        })?;
        if let Some(existing) = state.documents.get(&card.id) {
            if !existing.is_owned_by(&owner) {
                return Err(RemoteError::new(
                    RemoteErrorCode::PermissionDenied,
                    "card belongs to another owner",
                ));
            }
        }

        let mut stored = card.clone();
        stored.owner_id = Some(owner);
        stored.updated_at = now_epoch_ms();
        state.documents.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn get_card(&self, id: &CardId) -> RemoteResult<Option<Card>> {
        let state = self.lock_online()?;
        Ok(state.documents.get(id).cloned())
    }

    fn list_cards_for_owner(&self, owner_id: &OwnerId) -> RemoteResult<Vec<Card>> {
        let state = self.lock_online()?;
        Ok(state
            .documents
            .values()
            .filter(|card| card.is_owned_by(owner_id))
            .cloned()
            .collect())
    }

    fn delete_card(&self, id: &CardId) -> RemoteResult<()> {
        let mut state = self.lock_online()?;
        if let Some(code) = state.delete_failures.get(id) {
            return Err(RemoteError::new(code.clone(), "delete rejected"));
        }
        state.documents.remove(id);
        Ok(())
    }

    fn increment_view_count(&self, id: &CardId) -> RemoteResult<()> {
        let mut state = self.lock_online()?;
        if let Some(card) = state.documents.get_mut(id) {
            card.view_count = card.view_count.saturating_add(1);
        }
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
