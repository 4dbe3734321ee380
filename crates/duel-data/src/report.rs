//! Report assembly and CSV output.
//!
//! Joins folded [`MatchStats`] with player ratings, derives the rating
//! comparison columns and writes anonymised [`ReportRow`]s.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use duel_core::error::Result;
use duel_core::models::{MatchStats, PlayerId, RatingRecord, ReportRow, REPORT_COLUMNS};
use tracing::{info, warn};

// ── RatingLookup ──────────────────────────────────────────────────────────────

/// Anything that can answer "what is this player's rating?".
pub trait RatingLookup {
    fn rating(&self, id: &PlayerId) -> Option<RatingRecord>;
}

impl RatingLookup for BTreeMap<PlayerId, RatingRecord> {
    fn rating(&self, id: &PlayerId) -> Option<RatingRecord> {
        self.get(id).copied()
    }
}

impl RatingLookup for HashMap<PlayerId, RatingRecord> {
    fn rating(&self, id: &PlayerId) -> Option<RatingRecord> {
        self.get(id).copied()
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Rows ready to be written, plus the matches that could not be rated.
#[derive(Debug, Default)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    /// First missing identifier of every excluded match, in match order.
    pub missing: Vec<PlayerId>,
}

/// Build one row, or return the first participant without a rating.
pub fn assemble_row(
    stats: &MatchStats,
    lookup: &impl RatingLookup,
) -> std::result::Result<ReportRow, PlayerId> {
    let [id0, id1] = &stats.players;
    let r0 = lookup.rating(id0).ok_or_else(|| id0.clone())?;
    let r1 = lookup.rating(id1).ok_or_else(|| id1.clone())?;

    Ok(ReportRow {
        score0: stats.scores[0],
        score1: stats.scores[1],
        last_tie_time: stats.last_tie_time,
        lead_changes: stats.lead_changes,
        net_difference: stats.net_difference,
        elo_diff: r0.elo.abs_diff(r1.elo),
        elo0: r0.elo,
        elo1: r1.elo,
        games0: r0.games,
        games1: r1.games,
        first_frag_won: u8::from(stats.first_frag_won),
        higher_elo_won: u8::from(higher_rating_won(stats.scores, [r0.elo, r1.elo])),
        last_tie_score: stats.last_tie_score,
        map_name: stats.map_name.clone(),
    })
}

/// `true` when the strictly higher-rated player also has the strictly higher
/// score. Ties on either side never count.
pub fn higher_rating_won(scores: [i32; 2], elos: [i64; 2]) -> bool {
    (scores[0] > scores[1] && elos[0] > elos[1]) || (scores[0] < scores[1] && elos[0] < elos[1])
}

/// Assemble rows for every match whose players both have ratings.
pub fn assemble_report(matches: &[MatchStats], lookup: &impl RatingLookup) -> Report {
    let mut report = Report::default();

    for stats in matches {
        match assemble_row(stats, lookup) {
            Ok(row) => report.rows.push(row),
            Err(id) => {
                warn!("No rating cached for player {}; match excluded", id);
                report.missing.push(id);
            }
        }
    }

    report
}

// ── CSV output ────────────────────────────────────────────────────────────────

/// Write the header and `rows` as CSV to `writer`.
///
/// The header is always written, even for an empty report.
pub fn write_rows<W: Write>(writer: W, rows: &[ReportRow]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(REPORT_COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the report to `path`, creating parent directories if needed.
///
/// Returns the number of data rows written.
pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_rows(std::io::BufWriter::new(file), rows)?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
