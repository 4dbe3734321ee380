//! Batched rating lookups against the external rating service.
//!
//! The service takes up to 100 `+`-joined player identifiers in the URL path
//! and answers with `{"players": [{"steamid": ..., "<game type>": {"elo": ...,
//! "games": ...}}, ...]}`. Players without a rating for the configured game
//! type simply lack that member.

use std::collections::HashMap;
use std::time::Duration;

use duel_core::error::{Result, StatsError};
use duel_core::models::{PlayerId, RatingRecord};
use duel_core::settings::MAX_BATCH_SIZE;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

// ── RatingSource ──────────────────────────────────────────────────────────────

/// A batched rating query mechanism.
#[allow(async_fn_in_trait)]
pub trait RatingSource {
    /// Look up ratings for at most [`MAX_BATCH_SIZE`] identifiers.
    ///
    /// Identifiers without an applicable rating are absent from the result.
    async fn fetch_batch(&self, ids: &[PlayerId]) -> Result<Vec<(PlayerId, RatingRecord)>>;
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RatingResponse {
    #[serde(default)]
    players: Vec<PlayerEntry>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    steamid: PlayerId,
    /// One member per game type, plus whatever else the service adds.
    #[serde(flatten)]
    formats: HashMap<String, Value>,
}

// ── RatingClient ──────────────────────────────────────────────────────────────

/// HTTP client for the rating service.
#[derive(Clone)]
pub struct RatingClient {
    client: reqwest::Client,
    base_url: String,
    game_type: String,
}

impl RatingClient {
    /// Create a client for `base_url` reading the `game_type` sub-record.
    pub fn new(
        base_url: impl Into<String>,
        game_type: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("duel-stats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StatsError::RatingLookup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            game_type: game_type.into(),
        })
    }

    /// Request URL for one batch.
    pub fn batch_url(&self, ids: &[PlayerId]) -> String {
        let joined: Vec<&str> = ids.iter().map(PlayerId::as_str).collect();
        format!("{}/{}", self.base_url, joined.join("+"))
    }
}

impl RatingSource for RatingClient {
    async fn fetch_batch(&self, ids: &[PlayerId]) -> Result<Vec<(PlayerId, RatingRecord)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_BATCH_SIZE {
            return Err(StatsError::RatingLookup(format!(
                "batch of {} exceeds the limit of {}",
                ids.len(),
                MAX_BATCH_SIZE
            )));
        }

        let url = self.batch_url(ids);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StatsError::RatingLookup(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StatsError::RatingStatus {
                status: response.status().as_u16(),
                url,
            });
        }

        let body: RatingResponse = response
            .json()
            .await
            .map_err(|e| StatsError::RatingLookup(format!("invalid response body: {}", e)))?;

        Ok(extract_ratings(body, &self.game_type))
    }
}

/// Pull the `game_type` ratings out of a response.
fn extract_ratings(body: RatingResponse, game_type: &str) -> Vec<(PlayerId, RatingRecord)> {
    body.players
        .into_iter()
        .filter_map(|mut entry| {
            let raw = entry.formats.remove(game_type)?;
            match serde_json::from_value::<RatingRecord>(raw) {
                Ok(record) => Some((entry.steamid, record)),
                Err(e) => {
                    debug!("Ignoring {} rating for {}: {}", game_type, entry.steamid, e);
                    None
                }
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
