//! Shared types for duel-stats: the match-log event model, derived match
//! and rating records, the error taxonomy and command-line settings.

pub mod error;
pub mod models;
pub mod settings;
