//! Card synchronization between remote store, device cache and UI list.
//!
//! # Responsibility
//! - Own the tombstone set and the published view container.
//! - Run reconciliation cycles and the delete-with-tombstone flow.

pub mod reconciler;
pub mod tombstones;
pub mod view_state;
