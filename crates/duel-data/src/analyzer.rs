//! Per-match statistics folder.
//!
//! Walks the death events of one validated [`MatchLog`] in order and folds
//! them into a [`MatchStats`] summary: final scores, last tie, lead changes
//! and whether the first fragger went on to win.

use duel_core::error::StructuralError;
use duel_core::models::{MatchLog, MatchStats, PlayerDeath};
use tracing::debug;

// ── ScoreTrack ────────────────────────────────────────────────────────────────

/// Running state of the fold.
#[derive(Debug, Clone, Default)]
struct ScoreTrack {
    scores: [i32; 2],
    last_tie_time: u64,
    last_tie_score: i32,
    lead_changes: u32,
    /// Roster index of whoever landed the first non-suicide kill.
    first_fragger: Option<usize>,
}

impl ScoreTrack {
    /// Apply one scoring death, given the roster index it credits or debits.
    fn apply(&mut self, death: &PlayerDeath, effect: ScoreEffect) {
        // Ties are observed before the death is applied.
        if self.scores[0] == self.scores[1] {
            if self.scores[0] != 0 {
                self.lead_changes += 1;
            }
            self.last_tie_time = death.time;
            self.last_tie_score = self.scores[0];
        }

        match effect {
            ScoreEffect::Penalty(victim) => self.scores[victim] -= 1,
            ScoreEffect::Frag(killer) => {
                self.scores[killer] += 1;
                self.first_fragger.get_or_insert(killer);
            }
        }
    }

    fn first_frag_won(&self) -> bool {
        match self.first_fragger {
            Some(i) => self.scores[i] > self.scores[1 - i],
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScoreEffect {
    /// Suicide or environmental death: the victim loses a point.
    Penalty(usize),
    /// The killer gains a point.
    Frag(usize),
}

// ── MatchAnalyzer ─────────────────────────────────────────────────────────────

/// Stateless folder turning a validated match log into [`MatchStats`].
pub struct MatchAnalyzer;

impl MatchAnalyzer {
    /// Fold the non-warmup deaths of `log` into summary statistics.
    ///
    /// Fails when a scoring death names a player who is not on the roster.
    pub fn fold(log: &MatchLog) -> Result<MatchStats, StructuralError> {
        let mut track = ScoreTrack::default();

        for death in log.deaths.iter().filter(|d| !d.warmup) {
            let effect = Self::score_effect(log, death)?;
            track.apply(death, effect);
        }

        debug!(
            "MatchAnalyzer: {} vs {} on {} ended {}-{}",
            log.participants[0],
            log.participants[1],
            log.map_name,
            track.scores[0],
            track.scores[1]
        );

        Ok(MatchStats {
            players: log.participants.clone(),
            scores: track.scores,
            last_tie_time: track.last_tie_time,
            last_tie_score: track.last_tie_score,
            lead_changes: track.lead_changes,
            net_difference: track.scores[0].abs_diff(track.scores[1]),
            first_frag_won: track.first_frag_won(),
            map_name: log.map_name.clone(),
        })
    }

    fn score_effect(log: &MatchLog, death: &PlayerDeath) -> Result<ScoreEffect, StructuralError> {
        let (id, make): (_, fn(usize) -> ScoreEffect) = match &death.killer {
            Some(killer) => (&killer.steam_id, ScoreEffect::Frag),
            None => (&death.victim.steam_id, ScoreEffect::Penalty),
        };
        log.index_of(id)
            .map(make)
            .ok_or_else(|| StructuralError::UnknownParticipant(id.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
