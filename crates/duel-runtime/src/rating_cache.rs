//! Persistent player-rating cache.
//!
//! Maps player identifiers to [`RatingRecord`]s and lives in a single JSON
//! document between runs. Unknown identifiers are filled in through a
//! [`RatingSource`] in fixed-size batches, each identifier attempted once
//! per run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use duel_core::error::{Result, StatsError};
use duel_core::models::{PlayerId, RatingRecord};
use duel_core::settings::MAX_BATCH_SIZE;
use duel_data::report::RatingLookup;
use tracing::{debug, info};

use crate::rating_client::RatingSource;

// ── FillSummary ───────────────────────────────────────────────────────────────

/// What a [`RatingCache::fill`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillSummary {
    /// Identifiers sent to the rating source.
    pub requested: usize,
    /// Requested identifiers that came back with a rating.
    pub resolved: usize,
    /// Number of requests issued.
    pub batches: usize,
}

// ── RatingCache ───────────────────────────────────────────────────────────────

/// File-backed identifier → rating map.
///
/// # Example
/// ```no_run
/// use duel_runtime::rating_cache::RatingCache;
///
/// let cache = RatingCache::load("ratings.json").unwrap();
/// println!("{} cached players", cache.len());
/// ```
#[derive(Debug, Clone)]
pub struct RatingCache {
    /// Where the cache is persisted.
    path: PathBuf,
    /// Sorted so the persisted file is stable across runs.
    entries: BTreeMap<PlayerId, RatingRecord>,
}

impl RatingCache {
    /// An empty cache that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the cache stored at `path`. A missing file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No rating cache at {}; starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(StatsError::FileRead { path, source }),
        };

        let entries = serde_json::from_str(&content)?;
        Ok(Self { path, entries })
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &PlayerId) -> Option<&RatingRecord> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> &BTreeMap<PlayerId, RatingRecord> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The identifiers from `ids` that have no cached rating, in input order
    /// and without duplicates.
    pub fn missing<'a>(&self, ids: impl IntoIterator<Item = &'a PlayerId>) -> Vec<PlayerId> {
        let mut seen = std::collections::HashSet::new();
        ids.into_iter()
            .filter(|id| !self.entries.contains_key(*id) && seen.insert(*id))
            .cloned()
            .collect()
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    pub fn insert(&mut self, id: PlayerId, record: RatingRecord) {
        self.entries.insert(id, record);
    }

    /// Query `source` for every identifier in `ids`, `batch_size` at a time,
    /// merging whatever comes back.
    ///
    /// Each identifier is attempted once. The first failing request aborts the
    /// pass; batches merged before it are kept in memory.
    pub async fn fill(
        &mut self,
        source: &impl RatingSource,
        ids: &[PlayerId],
        batch_size: usize,
    ) -> Result<FillSummary> {
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        let mut summary = FillSummary::default();

        for (n, chunk) in ids.chunks(batch_size).enumerate() {
            info!("Fetching ratings, {} remaining", ids.len() - n * batch_size);

            let records = source.fetch_batch(chunk).await?;
            summary.batches += 1;
            summary.requested += chunk.len();
            summary.resolved += records.iter().filter(|(id, _)| chunk.contains(id)).count();

            for (id, record) in records {
                self.entries.insert(id, record);
            }
        }

        Ok(summary)
    }

    /// Atomically write the cache to its path, creating parent directories.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;

        // Write to a temp file then rename for atomicity.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(
            "Saved {} ratings to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl RatingLookup for RatingCache {
    fn rating(&self, id: &PlayerId) -> Option<RatingRecord> {
        self.entries.get(id).copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
