//! Read-only projections derived from cards.
//!
//! # Responsibility
//! - Build dashboard list entries and analytics figures from a `Card`.
//! - Build public share paths/URLs for a card id.
//!
//! # Invariants
//! - Projections are pure and deterministic; they are never persisted.

use crate::model::card::{Card, CardId};

/// Title shown when a card has no name yet.
pub const UNTITLED_CARD_TITLE: &str = "Untitled Card";

/// Dashboard entry combining a card with presentation-only fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardViewEntry {
    pub card: Card,
    /// Trimmed full name, or [`UNTITLED_CARD_TITLE`] when empty.
    pub display_title: String,
    pub views: u64,
    /// Estimated link clicks, `floor(views * 0.4)`.
    pub clicks: u64,
}

impl CardViewEntry {
    pub fn project(card: Card) -> Self {
        let name = card.profile.full_name.trim();
        let display_title = if name.is_empty() {
            UNTITLED_CARD_TITLE.to_string()
        } else {
            name.to_string()
        };
        let views = card.view_count;
        Self {
            card,
            display_title,
            views,
            clicks: estimate_clicks(views),
        }
    }

    pub fn card_id(&self) -> &CardId {
        &self.card.id
    }
}

/// Analytics summary for one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStats {
    pub views: u64,
    /// `floor(views * 0.4)`.
    pub link_clicks: u64,
    /// `floor(views * 0.8)`.
    pub unique_visitors: u64,
}

impl CardStats {
    pub fn from_views(views: u64) -> Self {
        Self {
            views,
            link_clicks: estimate_clicks(views),
            unique_visitors: scale_down(views, 4, 5),
        }
    }
}

/// Estimated clicks for a view count.
pub fn estimate_clicks(views: u64) -> u64 {
    scale_down(views, 2, 5)
}

fn scale_down(value: u64, numerator: u64, denominator: u64) -> u64 {
    // u128 keeps the multiplication exact for the full u64 range.
    let scaled = u128::from(value) * u128::from(numerator) / u128::from(denominator);
    scaled as u64
}

/// Path of the public card page, relative to the app origin.
pub fn public_card_path(id: &CardId) -> String {
    format!("/card/{id}")
}

/// Absolute public URL used for QR codes and share links.
pub fn public_card_url(base_url: &str, id: &CardId) -> String {
    format!("{}{}", base_url.trim().trim_end_matches('/'), public_card_path(id))
}
