//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate adapter calls into editor and public-viewer use-cases.
//! - Keep UI layers decoupled from storage details.

pub mod card_service;
pub mod public_card_service;
