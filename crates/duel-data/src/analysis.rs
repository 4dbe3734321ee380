//! Batch pass over a logs directory.
//!
//! Loads and folds every match log, returning the results in an explicit
//! [`MatchCollection`] together with per-outcome counts.

use std::collections::BTreeSet;
use std::path::Path;

use duel_core::error::StatsError;
use duel_core::models::{MatchStats, PlayerId};
use tracing::{debug, info, warn};

use crate::analyzer::MatchAnalyzer;
use crate::reader::{find_match_files, read_match_log, LoadedMatch};

// ── Public types ──────────────────────────────────────────────────────────────

/// What happened to a single match log.
#[derive(Debug)]
pub enum MatchOutcome {
    Folded(MatchStats),
    /// Expected skip: a participant has the unset identifier.
    Skipped,
    Failed(StatsError),
}

/// Everything the batch pass produced.
#[derive(Debug, Default)]
pub struct MatchCollection {
    /// Folded matches in file order.
    pub stats: Vec<MatchStats>,
    pub files_found: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl MatchCollection {
    /// Fold one outcome into the collection.
    pub fn record(&mut self, path: &Path, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Folded(stats) => self.stats.push(stats),
            MatchOutcome::Skipped => {
                debug!("Skipping {}: unset player identifier", path.display());
                self.skipped += 1;
            }
            MatchOutcome::Failed(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                self.failed += 1;
            }
        }
    }

    /// Unique participant identifiers across all folded matches, sorted.
    pub fn player_ids(&self) -> BTreeSet<PlayerId> {
        self.stats
            .iter()
            .flat_map(|m| m.players.iter().cloned())
            .collect()
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Load and fold the match log at `path`.
pub fn process_match(path: &Path) -> MatchOutcome {
    let log = match read_match_log(path) {
        Ok(LoadedMatch::Ready(log)) => log,
        Ok(LoadedMatch::UnsetParticipant) => return MatchOutcome::Skipped,
        Err(e) => return MatchOutcome::Failed(e),
    };

    match MatchAnalyzer::fold(&log) {
        Ok(stats) => MatchOutcome::Folded(stats),
        Err(source) => MatchOutcome::Failed(StatsError::Structural {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Run [`process_match`] over every match log under `logs_dir`.
pub fn collect_matches(logs_dir: &Path) -> MatchCollection {
    let files = find_match_files(logs_dir);
    info!("Found {} match logs to process", files.len());

    let mut collection = MatchCollection {
        files_found: files.len(),
        ..Default::default()
    };

    for path in &files {
        collection.record(path, process_match(path));
    }

    info!(
        "Parsed {} matches ({} skipped, {} failed)",
        collection.stats.len(),
        collection.skipped,
        collection.failed
    );

    collection
}

// ── Tests ─────────────────────────────────────────────────────────────────────
