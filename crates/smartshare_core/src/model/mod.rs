//! Card domain model and derived projections.
//!
//! # Responsibility
//! - Define canonical data structures used by sync and use-case services.
//! - Keep presentation-only derivations out of persisted documents.
//!
//! # Invariants
//! - Every card is identified by a stable, URL-safe `CardId`.
//! - Local hiding is represented by device tombstones, never by a card flag.

pub mod card;
pub mod view;
