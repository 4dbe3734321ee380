//! One report run, end to end.
//!
//! Folds every match log, brings the rating cache up to date for the players
//! that appear in them, persists the cache and writes the rated report.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use duel_core::error::Result;
use duel_core::settings::Settings;
use duel_data::analysis::collect_matches;
use duel_data::report::{assemble_report, write_report};
use tracing::{info, warn};

use crate::rating_cache::{FillSummary, RatingCache};
use crate::rating_client::RatingSource;

// ── Public types ──────────────────────────────────────────────────────────────

/// Paths and limits for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub logs_dir: PathBuf,
    pub output: PathBuf,
    pub cache_path: PathBuf,
    pub batch_size: usize,
}

impl From<&Settings> for RunConfig {
    fn from(s: &Settings) -> Self {
        Self {
            logs_dir: s.logs_dir.clone(),
            output: s.output.clone(),
            cache_path: s.cache_path(),
            batch_size: s.batch_size(),
        }
    }
}

/// Counters describing a finished run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    /// ISO-8601 timestamp when the run finished.
    pub generated_at: String,
    pub files_found: usize,
    pub matches_folded: usize,
    /// Matches skipped because a participant had the unset identifier.
    pub matches_skipped: usize,
    pub matches_failed: usize,
    pub cached_before: usize,
    pub cached_after: usize,
    pub ratings_requested: usize,
    pub ratings_resolved: usize,
    /// Folded matches left out of the report for lack of a rating.
    pub matches_missing_rating: usize,
    pub rows_written: usize,
    pub elapsed_seconds: f64,
}

// ── ReportOrchestrator ────────────────────────────────────────────────────────

/// Drives a single run. Without a rating source only cached ratings are used.
pub struct ReportOrchestrator<S> {
    config: RunConfig,
    source: Option<S>,
}

impl<S: RatingSource> ReportOrchestrator<S> {
    pub fn new(config: RunConfig, source: Option<S>) -> Self {
        Self { config, source }
    }

    /// Run the whole pipeline.
    ///
    /// A failing rating request aborts the run after the ratings merged so far
    /// have been written back to the cache.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();

        // ── Step 1: Fold matches ──────────────────────────────────────────
        let collection = collect_matches(&self.config.logs_dir);

        // ── Step 2: Load cache ────────────────────────────────────────────
        let mut cache = RatingCache::load(&self.config.cache_path)?;
        let cached_before = cache.len();
        info!("Loaded {} players from rating cache", cached_before);

        // ── Step 3: Look up unknown players ───────────────────────────────
        let player_ids = collection.player_ids();
        let missing = cache.missing(&player_ids);
        let fill = match &self.source {
            Some(source) if !missing.is_empty() => {
                match cache.fill(source, &missing, self.config.batch_size).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        if let Err(save_err) = cache.save() {
                            warn!("Could not save partial rating cache: {}", save_err);
                        }
                        return Err(e);
                    }
                }
            }
            None if !missing.is_empty() => {
                info!("Offline: {} players have no cached rating", missing.len());
                FillSummary::default()
            }
            _ => FillSummary::default(),
        };

        // ── Step 4: Persist cache ─────────────────────────────────────────
        cache.save()?;
        info!("Rating cache holds {} players", cache.len());

        // ── Step 5: Assemble and write ────────────────────────────────────
        let report = assemble_report(&collection.stats, &cache);
        let rows_written = write_report(&self.config.output, &report.rows)?;

        Ok(RunSummary {
            generated_at: Utc::now().to_rfc3339(),
            files_found: collection.files_found,
            matches_folded: collection.stats.len(),
            matches_skipped: collection.skipped,
            matches_failed: collection.failed,
            cached_before,
            cached_after: cache.len(),
            ratings_requested: fill.requested,
            ratings_resolved: fill.resolved,
            matches_missing_rating: report.missing.len(),
            rows_written,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubSource;
    use duel_core::error::StatsError;
    use duel_core::models::{PlayerId, RatingRecord};
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    // ── helpers ───────────────────────────────────────────────────────────

    fn write_match(dir: &Path, name: &str, roster: [&str; 2], kills: &[(u64, &str, &str)]) {
        std::fs::create_dir_all(dir).unwrap();
        let mut events = vec![json!({"event": {"TYPE": "MATCH_STARTED", "DATA": {
            "MAP": "furiousheights",
            "PLAYERS": [
                {"STEAM_ID": roster[0], "TEAM": 0},
                {"STEAM_ID": roster[1], "TEAM": 0}
            ]
        }}})];
        for (time, killer, victim) in kills {
            events.push(json!({"event": {"TYPE": "PLAYER_DEATH", "DATA": {
                "TIME": time,
                "WARMUP": false,
                "KILLER": {"STEAM_ID": killer},
                "VICTIM": {"STEAM_ID": victim}
            }}}));
        }
        std::fs::write(dir.join(name), json!(events).to_string()).unwrap();
    }

    fn config(root: &TempDir, batch_size: usize) -> RunConfig {
        RunConfig {
            logs_dir: root.path().join("json"),
            output: root.path().join("stats.csv"),
            cache_path: root.path().join("cache").join("ratings.json"),
            batch_size,
        }
    }

    fn seed_fixture(root: &TempDir) {
        let logs = root.path().join("json");
        write_match(&logs, "a.json", ["1", "2"], &[(1, "1", "2"), (2, "1", "2")]);
        write_match(&logs, "b.json", ["3", "2"], &[(5, "2", "3")]);
        write_match(&logs, "c.json", ["0", "2"], &[]);
        std::fs::write(logs.join("d.json"), "[]").unwrap();
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn test_run_config_from_settings() {
        let settings = Settings::load_from_args([
            "duel-stats",
            "--logs-dir",
            "/m",
            "--output",
            "/o.csv",
            "--cache-file",
            "/c.json",
            "--batch-size",
            "7",
        ])
        .unwrap();
        let cfg = RunConfig::from(&settings);
        assert_eq!(cfg.logs_dir, PathBuf::from("/m"));
        assert_eq!(cfg.output, PathBuf::from("/o.csv"));
        assert_eq!(cfg.cache_path, PathBuf::from("/c.json"));
        assert_eq!(cfg.batch_size, 7);
    }

    // ── full runs ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_run_end_to_end() {
        let root = TempDir::new().unwrap();
        seed_fixture(&root);
        let source = StubSource::with_ratings(&[("1", 1500, 20), ("2", 1400, 30)]);

        let orch = ReportOrchestrator::new(config(&root, 100), Some(source));
        let summary = orch.run().await.unwrap();

        assert_eq!(summary.files_found, 4);
        assert_eq!(summary.matches_folded, 2);
        assert_eq!(summary.matches_skipped, 1);
        assert_eq!(summary.matches_failed, 1);
        assert_eq!(summary.cached_before, 0);
        assert_eq!(summary.cached_after, 2);
        assert_eq!(summary.ratings_requested, 3);
        assert_eq!(summary.ratings_resolved, 2);
        assert_eq!(summary.matches_missing_rating, 1);
        assert_eq!(summary.rows_written, 1);

        let csv = std::fs::read_to_string(root.path().join("stats.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "2,0,1,0,2,100,1500,1400,20,30,1,1,0,furiousheights");

        let cache = RatingCache::load(root.path().join("cache").join("ratings.json")).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_uses_cache_and_is_identical() {
        let root = TempDir::new().unwrap();
        seed_fixture(&root);

        let first = ReportOrchestrator::new(
            config(&root, 100),
            Some(StubSource::with_ratings(&[("1", 1500, 20), ("2", 1400, 30)])),
        );
        first.run().await.unwrap();
        let first_csv = std::fs::read(root.path().join("stats.csv")).unwrap();

        // Only the still-unrated player is asked for again.
        let source = StubSource::with_ratings(&[]);
        let second = ReportOrchestrator::new(config(&root, 100), Some(source));
        let summary = second.run().await.unwrap();

        assert_eq!(summary.cached_before, 2);
        assert_eq!(summary.ratings_requested, 1);
        assert_eq!(std::fs::read(root.path().join("stats.csv")).unwrap(), first_csv);
    }

    #[tokio::test]
    async fn test_offline_run_uses_cache_only() {
        let root = TempDir::new().unwrap();
        seed_fixture(&root);

        let mut cache = RatingCache::empty(root.path().join("cache").join("ratings.json"));
        cache.insert(PlayerId::from("2"), RatingRecord { elo: 1600, games: 3 });
        cache.insert(PlayerId::from("3"), RatingRecord { elo: 1000, games: 9 });
        cache.save().unwrap();

        let orch: ReportOrchestrator<StubSource> =
            ReportOrchestrator::new(config(&root, 100), None);
        let summary = orch.run().await.unwrap();

        assert_eq!(summary.ratings_requested, 0);
        assert_eq!(summary.rows_written, 1);
        let csv = std::fs::read_to_string(root.path().join("stats.csv")).unwrap();
        assert!(csv.ends_with("0,1,5,0,1,600,1000,1600,9,3,1,1,0,furiousheights\n"));
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_but_saves_progress() {
        let root = TempDir::new().unwrap();
        seed_fixture(&root);
        let source = StubSource::with_ratings(&[("1", 1500, 20)]).failing_on_call(2);

        let orch = ReportOrchestrator::new(config(&root, 1), Some(source));
        let err = orch.run().await.unwrap_err();

        assert!(matches!(err, StatsError::RatingLookup(_)));
        assert!(!root.path().join("stats.csv").exists());
        let cache = RatingCache::load(root.path().join("cache").join("ratings.json")).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_run_with_no_logs_writes_header() {
        let root = TempDir::new().unwrap();
        let orch = ReportOrchestrator::new(config(&root, 100), Some(StubSource::with_ratings(&[])));

        let summary = orch.run().await.unwrap();
        assert_eq!(summary.files_found, 0);
        assert_eq!(summary.rows_written, 0);
        let csv = std::fs::read_to_string(root.path().join("stats.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
