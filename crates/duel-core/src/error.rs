use std::path::PathBuf;
use thiserror::Error;

/// Structural defects that make a single match log unusable.
///
/// These never abort a run: the offending match is logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// The log must contain exactly one `MATCH_STARTED` event.
    #[error("expected exactly one MATCH_STARTED event, found {0}")]
    StartEventCount(usize),

    /// The designated team must list exactly two players.
    #[error("expected 2 players on the match roster, found {0}")]
    ParticipantCount(usize),

    /// Both roster slots carry the same identifier.
    #[error("player {0} occupies both roster slots")]
    DuplicateParticipant(String),

    /// A scoring death referenced somebody who is not on the roster.
    #[error("death event references unknown player {0}")]
    UnknownParticipant(String),

    /// An event payload did not match the expected shape.
    #[error("malformed {kind} event: {reason}")]
    MalformedEvent { kind: String, reason: String },
}

/// All errors produced by duel-stats.
#[derive(Error, Debug)]
pub enum StatsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A match log violated one of its structural invariants.
    #[error("Malformed match log {path}: {source}")]
    Structural {
        path: PathBuf,
        #[source]
        source: StructuralError,
    },

    /// The rating service could not be reached or returned garbage.
    #[error("Rating lookup failed: {0}")]
    RatingLookup(String),

    /// The rating service answered with a non-success status.
    #[error("Rating service returned status {status} for {url}")]
    RatingStatus { status: u16, url: String },

    /// The report could not be serialized.
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the duel-stats crates.
pub type Result<T> = std::result::Result<T, StatsError>;
