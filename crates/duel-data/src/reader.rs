//! Match-log discovery and loading.
//!
//! Each `.json` file under the logs directory holds one match as an array of
//! `{"event": {"TYPE": ..., "DATA": ...}}` records. Loading decodes the
//! events and checks the roster invariants before anything is folded.

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use duel_core::error::{Result, StatsError, StructuralError};
use duel_core::models::{Event, EventRecord, MatchLog, MatchStarted, PlayerId, ROSTER_TEAM};
use tracing::{debug, warn};

/// Result of loading a structurally sound match log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedMatch {
    /// Both roster slots carry real identifiers.
    Ready(MatchLog),
    /// A roster slot carries the unset identifier; the match is unrated.
    UnsetParticipant,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.json` files recursively under `logs_dir`, sorted by path.
pub fn find_match_files(logs_dir: &Path) -> Vec<PathBuf> {
    if !logs_dir.exists() {
        warn!("Logs directory does not exist: {}", logs_dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(logs_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "json")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load and validate the match log stored at `path`.
pub fn read_match_log(path: &Path) -> Result<LoadedMatch> {
    let file = std::fs::File::open(path).map_err(|source| StatsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let loaded = parse_match_log(BufReader::new(file)).map_err(|e| match e {
        StatsError::Structural { source, .. } => StatsError::Structural {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    debug!("Loaded match log {}", path.display());
    Ok(loaded)
}

/// Parse a match-log document from any reader.
///
/// Structural errors carry an empty path; [`read_match_log`] fills it in.
pub fn parse_match_log(reader: impl Read) -> Result<LoadedMatch> {
    let records: Vec<EventRecord> = serde_json::from_reader(reader)?;
    let events = decode_events(records).map_err(|source| StatsError::Structural {
        path: PathBuf::new(),
        source,
    })?;
    validate_events(events).map_err(|source| StatsError::Structural {
        path: PathBuf::new(),
        source,
    })
}

/// Check the roster invariants and split out the death events.
pub fn validate_events(events: Vec<Event>) -> std::result::Result<LoadedMatch, StructuralError> {
    let mut started: Vec<MatchStarted> = Vec::new();
    let mut deaths = Vec::new();

    for event in events {
        match event {
            Event::MatchStarted(s) => started.push(s),
            Event::PlayerDeath(d) => deaths.push(d),
            Event::WarmupDeath | Event::Other(_) => {}
        }
    }

    if started.len() != 1 {
        return Err(StructuralError::StartEventCount(started.len()));
    }
    let start = started.remove(0);

    let roster: Vec<PlayerId> = start
        .players
        .into_iter()
        .filter(|slot| slot.team == ROSTER_TEAM)
        .map(|slot| slot.steam_id)
        .collect();

    let participants: [PlayerId; 2] = roster
        .try_into()
        .map_err(|r: Vec<PlayerId>| StructuralError::ParticipantCount(r.len()))?;

    if participants[0] == participants[1] {
        return Err(StructuralError::DuplicateParticipant(participants[0].to_string()));
    }

    if participants.iter().any(|p| p.is_unset()) {
        return Ok(LoadedMatch::UnsetParticipant);
    }

    Ok(LoadedMatch::Ready(MatchLog {
        map_name: start.map,
        participants,
        deaths,
    }))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn decode_events(records: Vec<EventRecord>) -> std::result::Result<Vec<Event>, StructuralError> {
    records
        .into_iter()
        .map(|record| Event::try_from(record.event))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
