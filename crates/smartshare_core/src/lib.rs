//! Core domain logic for SmartShare digital business cards.
//! This crate is the single source of truth for card sync invariants.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod service;
pub mod sync;

pub use cache::{CacheError, CacheResult, LocalCardCache, MemoryCardCache, SqliteCardCache};
pub use config::{ConfigError, SmartShareConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::card::{
    Card, CardId, CardProfile, CardStyle, CardTheme, CardValidationError, OwnerId, SocialLink,
};
pub use model::view::{public_card_url, CardStats, CardViewEntry, UNTITLED_CARD_TITLE};
pub use remote::{InMemoryRemoteStore, RemoteCardStore, RemoteError, RemoteErrorCode, RemoteResult};
pub use service::card_service::{CardService, CardServiceError};
pub use service::public_card_service::PublicCardService;
pub use sync::reconciler::{
    CardReconciler, DeleteFailure, DeleteFailureKind, DeleteOutcome, DeleteResolution, LoadReport,
    LoadSource, ResolveOutcome,
};
pub use sync::tombstones::{TombstoneSet, TOMBSTONE_KEY};
pub use sync::view_state::{PublishStatus, ViewState};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
