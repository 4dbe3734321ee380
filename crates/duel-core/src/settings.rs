use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{Result, StatsError};

/// Largest number of identifiers the rating service accepts per request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Default rating service endpoint.
pub const DEFAULT_RATING_URL: &str = "http://qlstats.net/elo";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Per-match duel statistics joined with player ratings
#[derive(Parser, Debug, Clone)]
#[command(
    name = "duel-stats",
    about = "Per-match duel statistics joined with player ratings",
    version
)]
pub struct Settings {
    /// Directory holding one JSON match log per file
    #[arg(long, env = "DUEL_STATS_LOGS_DIR", default_value = "json")]
    pub logs_dir: PathBuf,

    /// CSV report to write
    #[arg(long, default_value = "stats.csv")]
    pub output: PathBuf,

    /// Rating cache file (defaults to ~/.duel-stats/cache/ratings.json)
    #[arg(long, env = "DUEL_STATS_CACHE")]
    pub cache_file: Option<PathBuf>,

    /// Base URL of the rating service
    #[arg(long, env = "DUEL_STATS_RATING_URL", default_value = DEFAULT_RATING_URL)]
    pub rating_url: String,

    /// Rating format to read from each player entry
    #[arg(long, default_value = "duel")]
    pub game_type: String,

    /// Identifiers per rating request (1-100)
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u16).range(1..=100))]
    pub batch_size: u16,

    /// Rating request timeout in seconds (1-300)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub request_timeout: u64,

    /// Only use cached ratings; never contact the rating service
    #[arg(long)]
    pub offline: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply derived values.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.game_type.trim().is_empty() {
            return Err(StatsError::Config("game type must not be empty".into()));
        }
        if !(self.rating_url.starts_with("http://") || self.rating_url.starts_with("https://")) {
            return Err(StatsError::Config(format!(
                "rating url must be http(s): {}",
                self.rating_url
            )));
        }
        Ok(())
    }

    /// Cache file to use, falling back to the per-user default.
    pub fn cache_path(&self) -> PathBuf {
        match &self.cache_file {
            Some(p) => p.clone(),
            None => default_cache_path_in(
                &dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            ),
        }
    }

    pub fn batch_size(&self) -> usize {
        usize::from(self.batch_size).clamp(1, MAX_BATCH_SIZE)
    }
}

/// Default cache location rooted at `base_dir` (used for testing).
pub fn default_cache_path_in(base_dir: &Path) -> PathBuf {
    base_dir
        .join(".duel-stats")
        .join("cache")
        .join("ratings.json")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
