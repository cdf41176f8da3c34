use smartshare_core::{
    Card, CardId, CardReconciler, CardViewEntry, DeleteFailureKind, DeleteOutcome,
    DeleteResolution, InMemoryRemoteStore, LoadReport, LoadSource, LocalCardCache,
    MemoryCardCache, OwnerId, PublishStatus, RemoteCardStore, RemoteErrorCode, RemoteResult,
    ResolveOutcome, ViewState,
};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

type Reconciler = CardReconciler<Arc<InMemoryRemoteStore>, Arc<MemoryCardCache>>;

struct Fixture {
    remote: Arc<InMemoryRemoteStore>,
    cache: Arc<MemoryCardCache>,
    reconciler: Reconciler,
}

fn owner() -> OwnerId {
    OwnerId::parse("u1").unwrap()
}

fn id(value: &str) -> CardId {
    CardId::parse(value).unwrap()
}

fn named_card(value: &str) -> Card {
    let mut card = Card::with_id(id(value));
    card.profile.full_name = format!("Card {value}");
    card
}

fn fixture(ids: &[&str]) -> Fixture {
    let remote = Arc::new(InMemoryRemoteStore::with_session(owner()));
    for value in ids {
        remote.save_card(&named_card(value)).unwrap();
    }
    let cache = Arc::new(MemoryCardCache::new());
    let reconciler = CardReconciler::new(owner(), Arc::clone(&remote), Arc::clone(&cache));
    Fixture {
        remote,
        cache,
        reconciler,
    }
}

fn sorted_ids(entries: &[CardViewEntry]) -> Vec<String> {
    let mut ids: Vec<String> = entries
        .iter()
        .map(|entry| entry.card_id().to_string())
        .collect();
    ids.sort();
    ids
}

fn cached_ids(cache: &MemoryCardCache) -> Vec<String> {
    cache
        .cached_cards()
        .iter()
        .map(|card| card.id.to_string())
        .collect()
}

fn expect_failure(outcome: DeleteOutcome) -> smartshare_core::DeleteFailure {
    match outcome {
        DeleteOutcome::NeedsDecision(failure) => failure,
        other => panic!("expected a failed delete, got {other:?}"),
    }
}

#[test]
fn denied_delete_hidden_locally_stays_hidden_across_reloads() {
    let fx = fixture(&["A", "B"]);

    let report = fx.reconciler.load();
    assert_eq!(report.source, LoadSource::Remote);
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["A", "B"]);
    assert_eq!(cached_ids(&fx.cache), vec!["A", "B"]);

    fx.remote
        .fail_deletes_with(id("A"), RemoteErrorCode::PermissionDenied);
    let failure = expect_failure(fx.reconciler.delete(&id("A")));
    assert_eq!(failure.kind(), DeleteFailureKind::PermissionDenied);
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);

    let outcome = fx
        .reconciler
        .resolve(failure, DeleteResolution::HideLocally);
    assert!(matches!(
        outcome,
        ResolveOutcome::Hidden { ref card_id, publish: PublishStatus::Applied } if *card_id == id("A")
    ));
    assert_eq!(fx.reconciler.hidden_card_ids(), vec![id("A")]);
    assert_eq!(cached_ids(&fx.cache), vec!["B"]);
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);

    // Remote still returns A.
    assert!(fx.remote.document(&id("A")).is_some());
    let reload = fx.reconciler.load();
    assert_eq!(reload.suppressed, 1);
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);
    assert_eq!(cached_ids(&fx.cache), vec!["B"]);
}

#[test]
fn confirmed_delete_removes_card_from_view_and_cache() {
    let fx = fixture(&["A", "B"]);
    fx.reconciler.load();

    let outcome = fx.reconciler.delete(&id("A"));
    assert_eq!(outcome, DeleteOutcome::Deleted(id("A")));
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);
    assert_eq!(cached_ids(&fx.cache), vec!["B"]);
    assert!(fx.reconciler.hidden_card_ids().is_empty());

    fx.reconciler.load();
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);
}

#[test]
fn abandon_restores_card_still_present_remotely() {
    let fx = fixture(&["A", "B"]);
    fx.reconciler.load();
    fx.remote
        .fail_deletes_with(id("A"), RemoteErrorCode::PermissionDenied);

    let failure = expect_failure(fx.reconciler.delete(&id("A")));
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);

    match fx.reconciler.resolve(failure, DeleteResolution::Abandon) {
        ResolveOutcome::Reloaded(report) => assert_eq!(report.publish, PublishStatus::Applied),
        other => panic!("expected reload, got {other:?}"),
    }
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["A", "B"]);
    assert!(fx.reconciler.hidden_card_ids().is_empty());
}

#[test]
fn abandon_does_not_restore_card_gone_remotely() {
    let fx = fixture(&["A", "B"]);
    fx.reconciler.load();
    fx.remote
        .fail_deletes_with(id("A"), RemoteErrorCode::Unavailable);

    let failure = expect_failure(fx.reconciler.delete(&id("A")));
    assert_eq!(failure.kind(), DeleteFailureKind::Transient);
    assert!(failure.message().contains("unavailable"));

    // Another device removes A before the user answers.
    fx.remote.clear_delete_failure(&id("A"));
    fx.remote.delete_card(&id("A")).unwrap();

    fx.reconciler.resolve(failure, DeleteResolution::Abandon);
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["B"]);
}

#[test]
fn transient_failure_can_be_hidden_locally() {
    let fx = fixture(&["A"]);
    fx.reconciler.load();
    fx.remote
        .fail_deletes_with(id("A"), RemoteErrorCode::Other("deadline-exceeded".to_string()));

    let failure = expect_failure(fx.reconciler.delete(&id("A")));
    assert_eq!(failure.kind(), DeleteFailureKind::Transient);
    fx.reconciler
        .resolve(failure, DeleteResolution::HideLocally);

    fx.remote.clear_delete_failure(&id("A"));
    fx.reconciler.load();
    assert!(fx.reconciler.current_view().is_empty());
    assert!(fx.cache.get(&id("A")).is_none());
}

#[test]
fn reconciliation_twice_publishes_identical_views() {
    let fx = fixture(&["C", "A", "B"]);

    let first = fx.reconciler.load();
    let second = fx.reconciler.load();
    assert_eq!(first.entries, second.entries);
    assert_eq!(second.publish, PublishStatus::Applied);
    assert_eq!(fx.reconciler.current_view(), second.entries);
}

#[test]
fn degraded_load_publishes_exactly_the_cached_cards() {
    let fx = fixture(&["A", "B"]);
    fx.reconciler.load();

    // Tombstone written without a cache purge: degraded loads do not
    // re-filter the cache.
    fx.cache.add_tombstone(&id("A"));
    fx.remote.set_offline(true);

    let report = fx.reconciler.load();
    assert_eq!(report.source, LoadSource::Degraded);
    assert_eq!(report.suppressed, 0);
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), cached_ids(&fx.cache));
    assert_eq!(sorted_ids(&fx.reconciler.current_view()), vec!["A", "B"]);
}

#[test]
fn degraded_load_with_empty_cache_publishes_empty_view() {
    let fx = fixture(&["A"]);
    fx.remote.set_offline(true);

    let report = fx.reconciler.load();
    assert_eq!(report.source, LoadSource::Degraded);
    assert!(fx.reconciler.current_view().is_empty());
}

#[test]
fn tombstone_suppresses_card_recreated_with_same_id() {
    let fx = fixture(&["A", "B"]);
    fx.reconciler.load();
    fx.remote
        .fail_deletes_with(id("A"), RemoteErrorCode::PermissionDenied);
    let failure = expect_failure(fx.reconciler.delete(&id("A")));
    fx.reconciler
        .resolve(failure, DeleteResolution::HideLocally);

    fx.remote.clear_delete_failure(&id("A"));
    fx.remote.delete_card(&id("A")).unwrap();
    let mut recreated = named_card("A");
    recreated.profile.full_name = "Recreated".to_string();
    fx.remote.save_card(&recreated).unwrap();

    let report = fx.reconciler.load();
    assert_eq!(report.suppressed, 1);
    assert_eq!(sorted_ids(&report.entries), vec!["B"]);
    assert!(fx.cache.get(&id("A")).is_none());
}

#[test]
fn load_mirrors_remote_cards_into_cache() {
    let fx = fixture(&["A"]);
    fx.reconciler.load();

    let mut updated = fx.remote.document(&id("A")).unwrap();
    updated.profile.bio = "Creating digital experiences that matter.".to_string();
    fx.remote.save_card(&updated).unwrap();

    fx.reconciler.load();
    let cached = fx.cache.get(&id("A")).unwrap();
    assert_eq!(cached.profile.bio, "Creating digital experiences that matter.");
}

#[test]
fn view_entries_carry_derived_fields() {
    let fx = fixture(&[]);
    let mut card = Card::with_id(id("blank"));
    card.view_count = 10;
    card.owner_id = Some(owner());
    fx.remote.insert_document(card);

    let report = fx.reconciler.load();
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].display_title, "Untitled Card");
    assert_eq!(report.entries[0].clicks, 4);
}

/// Remote wrapper that exposes the published view while calls are in flight.
struct ObservingRemote {
    inner: InMemoryRemoteStore,
    view: OnceLock<Arc<ViewState>>,
    seen_during_delete: Mutex<Option<Vec<String>>>,
    publish_during_list: Mutex<bool>,
}

impl ObservingRemote {
    fn new(inner: InMemoryRemoteStore) -> Self {
        Self {
            inner,
            view: OnceLock::new(),
            seen_during_delete: Mutex::new(None),
            publish_during_list: Mutex::new(false),
        }
    }
}

impl RemoteCardStore for ObservingRemote {
    fn save_card(&self, card: &Card) -> RemoteResult<Card> {
        self.inner.save_card(card)
    }

    fn get_card(&self, id: &CardId) -> RemoteResult<Option<Card>> {
        self.inner.get_card(id)
    }

    fn list_cards_for_owner(&self, owner_id: &OwnerId) -> RemoteResult<Vec<Card>> {
        let cards = self.inner.list_cards_for_owner(owner_id)?;
        let mut publish = self.publish_during_list.lock().unwrap();
        if *publish {
            // A newer operation finishes while this fetch is in flight.
            let view = self.view.get().unwrap();
            let sequence = view.begin();
            view.publish(sequence, Vec::new());
            *publish = false;
        }
        Ok(cards)
    }

    fn delete_card(&self, id: &CardId) -> RemoteResult<()> {
        let view = self.view.get().unwrap();
        *self.seen_during_delete.lock().unwrap() = Some(sorted_ids(&view.snapshot()));
        self.inner.delete_card(id)
    }

    fn increment_view_count(&self, id: &CardId) -> RemoteResult<()> {
        self.inner.increment_view_count(id)
    }
}

fn observing_fixture(
    ids: &[&str],
) -> (
    Arc<ObservingRemote>,
    CardReconciler<Arc<ObservingRemote>, MemoryCardCache>,
) {
    let inner = InMemoryRemoteStore::with_session(owner());
    for value in ids {
        inner.save_card(&named_card(value)).unwrap();
    }
    let remote = Arc::new(ObservingRemote::new(inner));
    let reconciler = CardReconciler::new(owner(), Arc::clone(&remote), MemoryCardCache::new());
    remote.view.set(reconciler.view()).unwrap();
    (remote, reconciler)
}

#[test]
fn optimistic_removal_is_published_before_remote_delete_runs() {
    let (remote, reconciler) = observing_fixture(&["A", "B"]);
    reconciler.load();

    reconciler.delete(&id("A"));
    let seen = remote.seen_during_delete.lock().unwrap().clone();
    assert_eq!(seen, Some(vec!["B".to_string()]));
}

#[test]
fn load_started_before_a_newer_publish_is_discarded() {
    let (remote, reconciler) = observing_fixture(&["A", "B"]);
    *remote.publish_during_list.lock().unwrap() = true;

    let report = reconciler.load();
    assert_eq!(report.publish, PublishStatus::Stale);
    assert_eq!(report.entries.len(), 2);
    assert!(reconciler.current_view().is_empty());

    let next = reconciler.load();
    assert_eq!(next.publish, PublishStatus::Applied);
    assert_eq!(sorted_ids(&reconciler.current_view()), vec!["A", "B"]);
}

#[test]
fn closed_view_ignores_late_loads_but_cache_is_still_mirrored() {
    let fx = fixture(&["A"]);
    fx.reconciler.view().close();

    let report = fx.reconciler.load();
    assert_eq!(report.publish, PublishStatus::Closed);
    assert!(fx.reconciler.current_view().is_empty());
    assert_eq!(cached_ids(&fx.cache), vec!["A"]);
}

/// Remote whose next list call parks after fetching until released.
struct GatedRemote {
    inner: InMemoryRemoteStore,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl GatedRemote {
    /// Arms the gate; returns (fetched signal, release handle).
    fn arm(&self) -> (Receiver<()>, Sender<()>) {
        let (fetched_tx, fetched_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some((fetched_tx, release_rx));
        (fetched_rx, release_tx)
    }
}

impl RemoteCardStore for GatedRemote {
    fn save_card(&self, card: &Card) -> RemoteResult<Card> {
        self.inner.save_card(card)
    }

    fn get_card(&self, id: &CardId) -> RemoteResult<Option<Card>> {
        self.inner.get_card(id)
    }

    fn list_cards_for_owner(&self, owner_id: &OwnerId) -> RemoteResult<Vec<Card>> {
        let cards = self.inner.list_cards_for_owner(owner_id)?;
        let gate = self.gate.lock().unwrap().take();
        if let Some((fetched, release)) = gate {
            fetched.send(()).unwrap();
            release.recv().unwrap();
        }
        Ok(cards)
    }

    fn delete_card(&self, id: &CardId) -> RemoteResult<()> {
        self.inner.delete_card(id)
    }

    fn increment_view_count(&self, id: &CardId) -> RemoteResult<()> {
        self.inner.increment_view_count(id)
    }
}

type GatedReconciler = CardReconciler<Arc<GatedRemote>, Arc<MemoryCardCache>>;

fn gated_fixture(
    ids: &[&str],
) -> (Arc<GatedRemote>, Arc<MemoryCardCache>, Arc<GatedReconciler>) {
    let inner = InMemoryRemoteStore::with_session(owner());
    for value in ids {
        inner.save_card(&named_card(value)).unwrap();
    }
    let remote = Arc::new(GatedRemote {
        inner,
        gate: Mutex::new(None),
    });
    let cache = Arc::new(MemoryCardCache::new());
    let reconciler = Arc::new(CardReconciler::new(
        owner(),
        Arc::clone(&remote),
        Arc::clone(&cache),
    ));
    (remote, cache, reconciler)
}

/// Starts a load on another thread and waits until its fetch has returned.
fn start_parked_load(
    remote: &GatedRemote,
    reconciler: &Arc<GatedReconciler>,
) -> (thread::JoinHandle<LoadReport>, Sender<()>) {
    let (fetched, release) = remote.arm();
    let loader = {
        let reconciler = Arc::clone(reconciler);
        thread::spawn(move || reconciler.load())
    };
    fetched.recv().unwrap();
    (loader, release)
}

#[test]
fn load_in_flight_during_confirmed_delete_does_not_recache_card() {
    let (remote, cache, reconciler) = gated_fixture(&["A", "B"]);
    reconciler.load();
    assert_eq!(cached_ids(&cache), vec!["A", "B"]);

    let (loader, release) = start_parked_load(&remote, &reconciler);
    assert_eq!(reconciler.delete(&id("A")), DeleteOutcome::Deleted(id("A")));
    release.send(()).unwrap();
    let report = loader.join().unwrap();

    assert_eq!(report.publish, PublishStatus::Stale);
    assert_eq!(cached_ids(&cache), vec!["B"]);
    assert_eq!(sorted_ids(&reconciler.current_view()), vec!["B"]);

    remote.inner.set_offline(true);
    let degraded = reconciler.load();
    assert_eq!(degraded.source, LoadSource::Degraded);
    assert_eq!(sorted_ids(&reconciler.current_view()), vec!["B"]);
}

#[test]
fn hide_while_load_in_flight_keeps_card_out_of_view_and_cache() {
    let (remote, cache, reconciler) = gated_fixture(&["A", "B"]);
    reconciler.load();
    remote
        .inner
        .fail_deletes_with(id("A"), RemoteErrorCode::PermissionDenied);
    let failure = expect_failure(reconciler.delete(&id("A")));

    let (loader, release) = start_parked_load(&remote, &reconciler);
    reconciler.resolve(failure, DeleteResolution::HideLocally);
    release.send(()).unwrap();
    loader.join().unwrap();

    assert_eq!(cached_ids(&cache), vec!["B"]);
    assert_eq!(sorted_ids(&reconciler.current_view()), vec!["B"]);
    assert_eq!(reconciler.hidden_card_ids(), vec![id("A")]);
}
