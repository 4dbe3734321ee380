//! Runtime layer for duel-stats.
//!
//! Owns the persistent rating cache, the rating service client and the
//! orchestrator that drives one report run end to end.

pub mod orchestrator;
pub mod rating_cache;
pub mod rating_client;

pub use duel_core as core;
pub use duel_data as data;

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use duel_core::error::{Result, StatsError};
    use duel_core::models::{PlayerId, RatingRecord};

    use crate::rating_client::RatingSource;

    /// In-memory rating source that records every batch it is asked for.
    pub struct StubSource {
        known: BTreeMap<PlayerId, RatingRecord>,
        calls: Mutex<Vec<Vec<PlayerId>>>,
        fail_on_call: Option<usize>,
    }

    impl StubSource {
        pub fn with_ratings(entries: &[(&str, i64, u64)]) -> Self {
            Self {
                known: entries
                    .iter()
                    .map(|(id, elo, games)| {
                        (
                            PlayerId::from(*id),
                            RatingRecord {
                                elo: *elo,
                                games: *games,
                            },
                        )
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
                fail_on_call: None,
            }
        }

        /// Make the `n`-th request (1-based) fail.
        pub fn failing_on_call(mut self, n: usize) -> Self {
            self.fail_on_call = Some(n);
            self
        }

        pub fn calls(&self) -> Vec<Vec<PlayerId>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RatingSource for StubSource {
        async fn fetch_batch(&self, ids: &[PlayerId]) -> Result<Vec<(PlayerId, RatingRecord)>> {
            let call_number = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(ids.to_vec());
                calls.len()
            };
            if self.fail_on_call == Some(call_number) {
                return Err(StatsError::RatingLookup("connection reset".into()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.known.get(id).map(|r| (id.clone(), *r)))
                .collect())
        }
    }
}
