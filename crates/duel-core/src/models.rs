use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StructuralError;

/// Identifier the game server writes for a player it could not resolve.
pub const UNSET_PLAYER_ID: &str = "0";

/// Team number the duel roster is listed under in `MATCH_STARTED`.
pub const ROSTER_TEAM: i64 = 0;

/// Output column order of the report.
pub const REPORT_COLUMNS: [&str; 14] = [
    "score0",
    "score1",
    "lastTieTime",
    "leadChanges",
    "netDifference",
    "eloDiff",
    "elo0",
    "elo1",
    "games0",
    "games1",
    "firstFragWon",
    "higherEloWon",
    "lastTieScore",
    "mapName",
];

// ── PlayerId ──────────────────────────────────────────────────────────────────

/// A player's platform identifier, normalised to its decimal string form.
///
/// Match logs and the rating service disagree on whether identifiers are
/// JSON strings or numbers, so both are accepted when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the sentinel the server uses when the identifier is unknown.
    pub fn is_unset(&self) -> bool {
        self.0 == UNSET_PLAYER_ID
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlayerIdVisitor;

        impl<'de> Visitor<'de> for PlayerIdVisitor {
            type Value = PlayerId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a player identifier as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PlayerId, E> {
                Ok(PlayerId::new(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<PlayerId, E> {
                Ok(PlayerId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PlayerId, E> {
                Ok(PlayerId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<PlayerId, E> {
                Ok(PlayerId(v.to_string()))
            }
        }

        deserializer.deserialize_any(PlayerIdVisitor)
    }
}

// ── Raw events ────────────────────────────────────────────────────────────────

/// One element of a match-log document as written by the stats collector.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub event: RawEvent,
}

/// An event envelope before its payload has been interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "TYPE")]
    pub kind: String,
    #[serde(rename = "DATA", default)]
    pub data: serde_json::Value,
}

/// A player reference inside an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerRef {
    #[serde(rename = "STEAM_ID")]
    pub steam_id: PlayerId,
}

/// A roster entry of `MATCH_STARTED`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterSlot {
    #[serde(rename = "STEAM_ID")]
    pub steam_id: PlayerId,
    #[serde(rename = "TEAM")]
    pub team: i64,
}

/// Payload of `MATCH_STARTED`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchStarted {
    #[serde(rename = "MAP")]
    pub map: String,
    #[serde(rename = "PLAYERS")]
    pub players: Vec<RosterSlot>,
}

/// Payload of `PLAYER_DEATH`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerDeath {
    /// Seconds since the match started.
    #[serde(rename = "TIME")]
    pub time: u64,
    #[serde(rename = "WARMUP", default)]
    pub warmup: bool,
    /// `None` for suicides and environmental deaths.
    #[serde(rename = "KILLER", default)]
    pub killer: Option<PlayerRef>,
    #[serde(rename = "VICTIM")]
    pub victim: PlayerRef,
}

/// A decoded match event. Kinds the report does not use are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MatchStarted(MatchStarted),
    PlayerDeath(PlayerDeath),
    /// A `PLAYER_DEATH` flagged as warmup. Its payload is not decoded.
    WarmupDeath,
    Other(String),
}

impl TryFrom<RawEvent> for Event {
    type Error = StructuralError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let malformed = |kind: &str, e: serde_json::Error| StructuralError::MalformedEvent {
            kind: kind.to_string(),
            reason: e.to_string(),
        };

        match raw.kind.as_str() {
            "MATCH_STARTED" => serde_json::from_value(raw.data)
                .map(Event::MatchStarted)
                .map_err(|e| malformed(&raw.kind, e)),
            "PLAYER_DEATH" if is_warmup(&raw.data) => Ok(Event::WarmupDeath),
            "PLAYER_DEATH" => serde_json::from_value(raw.data)
                .map(Event::PlayerDeath)
                .map_err(|e| malformed(&raw.kind, e)),
            _ => Ok(Event::Other(raw.kind)),
        }
    }
}

fn is_warmup(data: &serde_json::Value) -> bool {
    data.get("WARMUP")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

// ── Validated match ───────────────────────────────────────────────────────────

/// A match log that passed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLog {
    pub map_name: String,
    /// Roster order; index 0 and 1 map to `score0` / `score1`.
    pub participants: [PlayerId; 2],
    /// Death events in log order. Decoded logs carry no warmup deaths.
    pub deaths: Vec<PlayerDeath>,
}

impl MatchLog {
    /// Roster index of `id`, if it belongs to this match.
    pub fn index_of(&self, id: &PlayerId) -> Option<usize> {
        self.participants.iter().position(|p| p == id)
    }
}

// ── Derived records ───────────────────────────────────────────────────────────

/// Summary of one folded match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub players: [PlayerId; 2],
    pub scores: [i32; 2],
    /// Timestamp of the last death that was preceded by a tied score.
    pub last_tie_time: u64,
    pub last_tie_score: i32,
    pub lead_changes: u32,
    pub net_difference: u32,
    pub first_frag_won: bool,
    pub map_name: String,
}

/// A player's rating for the configured game type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(deserialize_with = "deserialize_rating")]
    pub elo: i64,
    #[serde(default)]
    pub games: u64,
}

/// Accept integer or fractional ratings, rounding the latter.
fn deserialize_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    value
        .as_f64()
        .map(|v| v.round() as i64)
        .ok_or_else(|| de::Error::custom(format!("rating out of range: {}", value)))
}

/// One anonymised output line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub score0: i32,
    pub score1: i32,
    pub last_tie_time: u64,
    pub lead_changes: u32,
    pub net_difference: u32,
    pub elo_diff: u64,
    pub elo0: i64,
    pub elo1: i64,
    pub games0: u64,
    pub games1: u64,
    pub first_frag_won: u8,
    pub higher_elo_won: u8,
    pub last_tie_score: i32,
    pub map_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_from_string_and_number() {
        let a: PlayerId = serde_json::from_str(r#""76561198000000001""#).unwrap();
        let b: PlayerId = serde_json::from_str("76561198000000001").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "76561198000000001");
    }

    #[test]
    fn test_player_id_unset() {
        let zero: PlayerId = serde_json::from_str("0").unwrap();
        assert!(zero.is_unset());
        assert!(!PlayerId::from("12").is_unset());
    }

    #[test]
    fn test_event_decodes_match_started() {
        let raw: RawEvent = serde_json::from_value(serde_json::json!({
            "TYPE": "MATCH_STARTED",
            "DATA": {
                "MAP": "bloodrun",
                "PLAYERS": [
                    {"STEAM_ID": "1", "TEAM": 0, "NAME": "a"},
                    {"STEAM_ID": 2, "TEAM": 0, "NAME": "b"}
                ]
            }
        }))
        .unwrap();

        match Event::try_from(raw).unwrap() {
            Event::MatchStarted(started) => {
                assert_eq!(started.map, "bloodrun");
                assert_eq!(started.players.len(), 2);
                assert_eq!(started.players[1].steam_id, PlayerId::from("2"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_decodes_suicide_death() {
        let raw: RawEvent = serde_json::from_value(serde_json::json!({
            "TYPE": "PLAYER_DEATH",
            "DATA": {"TIME": 42, "KILLER": null, "VICTIM": {"STEAM_ID": "1"}}
        }))
        .unwrap();

        let Event::PlayerDeath(death) = Event::try_from(raw).unwrap() else {
            panic!("expected a death event");
        };
        assert_eq!(death.time, 42);
        assert!(!death.warmup);
        assert!(death.killer.is_none());
    }

    #[test]
    fn test_event_malformed_death() {
        let raw: RawEvent = serde_json::from_value(serde_json::json!({
            "TYPE": "PLAYER_DEATH",
            "DATA": {"TIME": 42}
        }))
        .unwrap();

        let err = Event::try_from(raw).unwrap_err();
        assert!(matches!(err, StructuralError::MalformedEvent { ref kind, .. } if kind == "PLAYER_DEATH"));
    }

    #[test]
    fn test_event_warmup_death_not_decoded() {
        let raw: RawEvent = serde_json::from_value(serde_json::json!({
            "TYPE": "PLAYER_DEATH",
            "DATA": {"TIME": 1.5, "WARMUP": true}
        }))
        .unwrap();
        assert_eq!(Event::try_from(raw).unwrap(), Event::WarmupDeath);
    }

    #[test]
    fn test_event_other_kind_kept() {
        let raw: RawEvent =
            serde_json::from_value(serde_json::json!({"TYPE": "ROUND_OVER"})).unwrap();
        assert_eq!(
            Event::try_from(raw).unwrap(),
            Event::Other("ROUND_OVER".into())
        );
    }

    #[test]
    fn test_rating_record_rounds_fractional_elo() {
        let rec: RatingRecord = serde_json::from_str(r#"{"elo": 1499.6, "games": 12}"#).unwrap();
        assert_eq!(rec, RatingRecord { elo: 1500, games: 12 });
    }

    #[test]
    fn test_report_row_field_names_match_columns() {
        let row = ReportRow {
            score0: 1,
            score1: 0,
            last_tie_time: 0,
            lead_changes: 0,
            net_difference: 1,
            elo_diff: 0,
            elo0: 0,
            elo1: 0,
            games0: 0,
            games1: 0,
            first_frag_won: 0,
            higher_elo_won: 0,
            last_tie_score: 0,
            map_name: String::new(),
        };
        let value = serde_json::to_value(&row).unwrap();
        let obj = value.as_object().unwrap();
        for column in REPORT_COLUMNS {
            assert!(obj.contains_key(column), "missing column {}", column);
        }
        assert_eq!(obj.len(), REPORT_COLUMNS.len());
    }
}
