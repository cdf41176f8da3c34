//! Card domain model.
//!
//! # Responsibility
//! - Define the canonical card document shared by editor, dashboard and
//!   public viewer.
//! - Validate identifiers that leave the device (share links, store keys).
//!
//! # Invariants
//! - `CardId` is URL-safe and immutable once assigned.
//! - `view_count` never decreases through core APIs.
//! - Saves are full overwrites; there is no partial-field merge.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MAX_CARD_ID_CHARS: usize = 128;

static CARD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid card id regex"));

/// Validation errors for card identity and payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    EmptyCardId,
    CardIdTooLong(usize),
    CardIdNotUrlSafe(String),
    EmptyOwnerId,
    DuplicateLinkId(String),
    EmptyLinkUrl(String),
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCardId => write!(f, "card id cannot be empty"),
            Self::CardIdTooLong(len) => write!(
                f,
                "card id has {len} chars; at most {MAX_CARD_ID_CHARS} are allowed"
            ),
            Self::CardIdNotUrlSafe(value) => {
                write!(f, "card id `{value}` contains characters that are not URL-safe")
            }
            Self::EmptyOwnerId => write!(f, "owner id cannot be empty"),
            Self::DuplicateLinkId(value) => write!(f, "duplicate link id `{value}`"),
            Self::EmptyLinkUrl(value) => write!(f, "active link `{value}` has an empty url"),
        }
    }
}

impl Error for CardValidationError {}

/// Opaque, URL-safe card identifier.
///
/// Generated client-side at creation and embedded verbatim in share links.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Generates a fresh identifier (hyphenated UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parses and validates a caller-provided identifier, trimming
    /// surrounding whitespace first.
    pub fn parse(value: &str) -> Result<Self, CardValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CardValidationError::EmptyCardId);
        }
        let len = trimmed.chars().count();
        if len > MAX_CARD_ID_CHARS {
            return Err(CardValidationError::CardIdTooLong(len));
        }
        if !CARD_ID_RE.is_match(trimmed) {
            return Err(CardValidationError::CardIdNotUrlSafe(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strict conversion used when decoding stored documents: surrounding
/// whitespace is rejected rather than trimmed, so the id keeps addressing
/// the same remote document.
impl TryFrom<String> for CardId {
    type Error = CardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().len() != value.len() && !value.trim().is_empty() {
            return Err(CardValidationError::CardIdNotUrlSafe(value));
        }
        Self::parse(&value)
    }
}

impl From<CardId> for String {
    fn from(value: CardId) -> Self {
        value.0
    }
}

/// Opaque identifier of the authenticated owner, used only as a query scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn parse(value: &str) -> Result<Self, CardValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CardValidationError::EmptyOwnerId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = CardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

/// Visual style preset of a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStyle {
    Classic,
    #[default]
    Modern,
    Glass,
    Neon,
}

/// Theme settings carried with the card. Never inspected by sync code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTheme {
    pub primary_color: String,
    pub background_color: String,
    pub font_family: String,
    #[serde(default)]
    pub style: CardStyle,
}

impl Default for CardTheme {
    fn default() -> Self {
        Self {
            primary_color: "#3b82f6".to_string(),
            background_color: "#0f172a".to_string(),
            font_family: "Inter".to_string(),
            style: CardStyle::Modern,
        }
    }
}

/// One entry of the card's ordered link list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Icon name resolved by the UI layer.
    pub icon: String,
    pub active: bool,
}

impl SocialLink {
    /// Creates an active link with a generated id.
    pub fn new(title: impl Into<String>, url: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            url: url.into(),
            icon: icon.into(),
            active: true,
        }
    }
}

/// Display fields of a card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub theme: CardTheme,
    /// Optional UPI payment handle, e.g. `name@bank`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_name: Option<String>,
}

/// User-owned card document as stored remotely and mirrored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    /// Stamped by the remote store from the current session on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,
    #[serde(flatten)]
    pub profile: CardProfile,
    #[serde(default)]
    pub links: Vec<SocialLink>,
    /// Public visit counter. Serialized as `views` to match stored documents.
    #[serde(default, rename = "views")]
    pub view_count: u64,
    /// Epoch milliseconds of the last save.
    #[serde(default)]
    pub updated_at: i64,
}

impl Card {
    /// Creates an empty card with a generated id.
    pub fn draft() -> Self {
        Self::with_id(CardId::generate())
    }

    /// Creates an empty card for an existing id.
    pub fn with_id(id: CardId) -> Self {
        Self {
            id,
            owner_id: None,
            profile: CardProfile::default(),
            links: Vec::new(),
            view_count: 0,
            updated_at: 0,
        }
    }

    /// Returns whether `owner` owns this card.
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        self.owner_id.as_ref() == Some(owner)
    }

    /// Validates payload shape before persistence.
    ///
    /// # Errors
    /// - `DuplicateLinkId` when two links share one id.
    /// - `EmptyLinkUrl` when an active link has a blank url.
    pub fn validate(&self) -> Result<(), CardValidationError> {
        let mut seen = BTreeSet::new();
        for link in &self.links {
            if !seen.insert(link.id.as_str()) {
                return Err(CardValidationError::DuplicateLinkId(link.id.clone()));
            }
            if link.active && link.url.trim().is_empty() {
                return Err(CardValidationError::EmptyLinkUrl(link.id.clone()));
            }
        }
        Ok(())
    }
}
