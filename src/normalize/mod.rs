//! Record normalizer.
//!
//! Turns raw match records into the flat [`GameTable`]:
//! - null deck names become `"Other"`
//! - deck-type labels are derived for both sides
//! - card history is split into per-side card-name lists
//! - the `added` timestamp is optionally split into calendar fields
//! - games with no card plays are dropped
//!
//! Normalization is pure: the same input always gives the same table.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::{
    deck_type, DateParts, GameTable, MatchRecord, NormalizedMatch, Side, OTHER_DECK,
};

/// Format of the `added` timestamp, e.g. `2016-03-01T21:03:12.000Z`.
pub const ADDED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// What to do with a record that fails schema validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Fail the whole batch on the first bad record
    #[default]
    Abort,
    /// Log a warning and leave the record out
    SkipAndWarn,
}

impl std::str::FromStr for SchemaPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "abort" => Ok(SchemaPolicy::Abort),
            "skip_and_warn" | "skip" => Ok(SchemaPolicy::SkipAndWarn),
            other => Err(format!("unknown schema policy: {}", other)),
        }
    }
}

/// Options for a normalization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Split `added` into year/month/day/hour/minute/second
    pub split_dates: bool,
    pub schema_policy: SchemaPolicy,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            split_dates: true,
            schema_policy: SchemaPolicy::Abort,
        }
    }
}

/// Result of a normalization run.
#[derive(Debug, Clone)]
pub struct NormalizeReport {
    pub table: GameTable,
    /// Records given as input
    pub input: usize,
    /// Records skipped for schema errors
    pub skipped: usize,
    /// Records dropped because no cards were played
    pub dropped_empty: usize,
}

/// Validate and normalize raw JSON records.
pub fn normalize(raw: &[Value], options: &NormalizeOptions) -> Result<NormalizeReport> {
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (index, value) in raw.iter().enumerate() {
        match validate(index, value, options) {
            Ok(record) => records.push((index, record)),
            Err(e) if e.is_schema() && options.schema_policy == SchemaPolicy::SkipAndWarn => {
                warn!("Skipping record: {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let mut report = normalize_indexed(records, options)?;
    report.input = raw.len();
    report.skipped = skipped;
    Ok(report)
}

/// Normalize records that are already validated.
///
/// Feeding `table.to_records()` back through this yields the same derived
/// fields as the original table.
pub fn normalize_records(
    records: Vec<MatchRecord>,
    options: &NormalizeOptions,
) -> Result<NormalizeReport> {
    normalize_indexed(records.into_iter().enumerate().collect(), options)
}

/// Validate one raw record, including fields the options make required.
fn validate(index: usize, value: &Value, options: &NormalizeOptions) -> Result<MatchRecord> {
    let record = MatchRecord::from_value(index, value)?;
    if options.split_dates && record.added.is_none() {
        return Err(AnalysisError::missing(index, "added"));
    }
    Ok(record)
}

fn normalize_indexed(
    records: Vec<(usize, MatchRecord)>,
    options: &NormalizeOptions,
) -> Result<NormalizeReport> {
    let input = records.len();
    let mut rows = Vec::with_capacity(input);
    let mut dropped_empty = 0;

    for (index, record) in records {
        let row = normalize_record(index, record, options.split_dates)?;
        if row.card_history.is_empty() {
            debug!("Dropping record {} with empty card history", index);
            dropped_empty += 1;
            continue;
        }
        rows.push(row);
    }

    info!(
        "Normalized {} games ({} dropped with no card plays)",
        rows.len(),
        dropped_empty
    );

    Ok(NormalizeReport {
        table: GameTable::new(rows),
        input,
        skipped: 0,
        dropped_empty,
    })
}

fn normalize_record(index: usize, record: MatchRecord, split_dates: bool) -> Result<NormalizedMatch> {
    let date = if split_dates {
        let added = record
            .added
            .as_deref()
            .ok_or_else(|| AnalysisError::missing(index, "added"))?;
        Some(parse_added(index, added)?)
    } else {
        None
    };

    let hero_deck = record.hero_deck.unwrap_or_else(|| OTHER_DECK.to_string());
    let opponent_deck = record
        .opponent_deck
        .unwrap_or_else(|| OTHER_DECK.to_string());

    let cards_for = |side: Side| -> Vec<String> {
        record
            .card_history
            .iter()
            .filter(|event| event.player == side)
            .map(|event| event.card_name.clone())
            .collect()
    };
    let p_cards_played = cards_for(Side::Me);
    let o_cards_played = cards_for(Side::Opponent);

    Ok(NormalizedMatch {
        p_deck_type: deck_type(&hero_deck, &record.hero),
        o_deck_type: deck_type(&opponent_deck, &record.opponent),
        p_cards_played,
        o_cards_played,
        date,
        hero: record.hero,
        hero_deck,
        opponent: record.opponent,
        opponent_deck,
        mode: record.mode,
        result: record.result,
        duration: record.duration,
        coin: record.coin,
        added: record.added,
        card_history: record.card_history,
    })
}

/// Split an `added` timestamp into calendar fields.
pub fn parse_added(index: usize, value: &str) -> Result<DateParts> {
    let ts = NaiveDateTime::parse_from_str(value, ADDED_FORMAT).map_err(|source| {
        AnalysisError::Parse {
            record: index,
            value: value.to_string(),
            source,
        }
    })?;

    Ok(DateParts {
        year: ts.year(),
        month: ts.month(),
        day: ts.day(),
        hour: ts.hour(),
        minute: ts.minute(),
        second: ts.second(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardPlayEvent, GameResult};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn game(hero_deck: Value, result: &str, card_history: Value) -> Value {
        json!({
            "hero": "Mage",
            "hero_deck": hero_deck,
            "opponent": "Warrior",
            "opponent_deck": "Control",
            "mode": "ranked",
            "result": result,
            "duration": 300,
            "coin": false,
            "added": "2016-03-01T21:03:12.000Z",
            "card_history": card_history,
        })
    }

    fn fireball_games() -> Vec<Value> {
        vec![
            game(
                Value::Null,
                "win",
                json!([{"card": {"name": "Fireball"}, "player": "me", "turn": 3}]),
            ),
            game(
                json!("Tempo"),
                "loss",
                json!([{"card": {"name": "Fireball"}, "player": "me", "turn": 2}]),
            ),
            game(json!("Tempo"), "win", json!([])),
        ]
    }

    #[test]
    fn test_drops_games_without_card_plays() {
        let report = normalize(&fireball_games(), &NormalizeOptions::default()).unwrap();

        assert_eq!(report.input, 3);
        assert_eq!(report.table.len(), 2);
        assert_eq!(report.dropped_empty, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_null_deck_becomes_other() {
        let report = normalize(&fireball_games(), &NormalizeOptions::default()).unwrap();
        let rows = report.table.rows();

        assert_eq!(rows[0].hero_deck, "Other");
        assert_eq!(rows[0].p_deck_type, "Other_Mage");
        assert_eq!(rows[1].p_deck_type, "Tempo_Mage");
        assert_eq!(rows[0].o_deck_type, "Control_Warrior");
    }

    #[test]
    fn test_deck_types_never_empty() {
        let report = normalize(&fireball_games(), &NormalizeOptions::default()).unwrap();
        for row in report.table.rows() {
            assert!(!row.p_deck_type.is_empty());
            assert!(!row.o_deck_type.is_empty());
        }
    }

    #[test]
    fn test_cards_split_by_side_in_order() {
        let raw = vec![game(
            json!("Tempo"),
            "win",
            json!([
                {"card": {"name": "Frostbolt"}, "player": "me", "turn": 2},
                {"card": {"name": "Fiery War Axe"}, "player": "opponent", "turn": 2},
                {"card": {"name": "Fireball"}, "player": "me", "turn": 4},
                {"card": {"name": "Shield Block"}, "player": "opponent", "turn": 4},
                {"card": {"name": "Frostbolt"}, "player": "me", "turn": 5}
            ]),
        )];

        let report = normalize(&raw, &NormalizeOptions::default()).unwrap();
        let row = &report.table.rows()[0];

        assert_eq!(row.p_cards_played, vec!["Frostbolt", "Fireball", "Frostbolt"]);
        assert_eq!(row.o_cards_played, vec!["Fiery War Axe", "Shield Block"]);
        assert_eq!(row.card_history[1], CardPlayEvent::new("Fiery War Axe", Side::Opponent, 2));
    }

    #[test]
    fn test_split_dates() {
        let report = normalize(&fireball_games(), &NormalizeOptions::default()).unwrap();
        let date = report.table.rows()[0].date.unwrap();

        assert_eq!(
            date,
            DateParts {
                year: 2016,
                month: 3,
                day: 1,
                hour: 21,
                minute: 3,
                second: 12,
            }
        );
    }

    #[test]
    fn test_dates_not_split_when_disabled() {
        let options = NormalizeOptions {
            split_dates: false,
            ..Default::default()
        };
        let mut raw = fireball_games();
        raw[0].as_object_mut().unwrap().remove("added");

        let report = normalize(&raw, &options).unwrap();
        assert!(report.table.rows().iter().all(|r| r.date.is_none()));
    }

    #[test]
    fn test_malformed_timestamp_is_parse_error() {
        let mut raw = fireball_games();
        raw[1]["added"] = json!("yesterday");

        let err = normalize(&raw, &NormalizeOptions::default()).unwrap_err();
        match err {
            AnalysisError::Parse { record, value, .. } => {
                assert_eq!(record, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_field_aborts_by_default() {
        let mut raw = fireball_games();
        raw[1].as_object_mut().unwrap().remove("opponent");

        let err = normalize(&raw, &NormalizeOptions::default()).unwrap_err();
        match err {
            AnalysisError::Schema { record, field, .. } => {
                assert_eq!(record, 1);
                assert_eq!(field, "opponent");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_policy_drops_bad_records() {
        let mut raw = fireball_games();
        raw[0].as_object_mut().unwrap().remove("mode");

        let options = NormalizeOptions {
            schema_policy: SchemaPolicy::SkipAndWarn,
            ..Default::default()
        };
        let report = normalize(&raw, &options).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.table.len(), 1);
        assert_eq!(report.table.rows()[0].result, GameResult::Loss);
    }

    #[test]
    fn test_skip_policy_covers_missing_added() {
        let mut raw = fireball_games();
        raw[1].as_object_mut().unwrap().remove("added");

        let options = NormalizeOptions {
            schema_policy: SchemaPolicy::SkipAndWarn,
            ..Default::default()
        };
        let report = normalize(&raw, &options).unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.table.len(), 1);
        assert_eq!(report.table.rows()[0].result, GameResult::Win);

        // Abort still fails on the same input
        match normalize(&raw, &NormalizeOptions::default()) {
            Err(AnalysisError::Schema { record, field, .. }) => {
                assert_eq!(record, 1);
                assert_eq!(field, "added");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_policy_still_fails_on_parse_errors() {
        let mut raw = fireball_games();
        raw[0]["added"] = json!("2016-13-45");

        let options = NormalizeOptions {
            schema_policy: SchemaPolicy::SkipAndWarn,
            ..Default::default()
        };
        assert!(matches!(
            normalize(&raw, &options),
            Err(AnalysisError::Parse { .. })
        ));
    }

    #[test]
    fn test_renormalizing_is_idempotent() {
        let first = normalize(&fireball_games(), &NormalizeOptions::default()).unwrap();
        let second =
            normalize_records(first.table.to_records(), &NormalizeOptions::default()).unwrap();

        assert_eq!(first.table, second.table);
    }

    #[test]
    fn test_schema_policy_parse() {
        assert_eq!("abort".parse::<SchemaPolicy>().unwrap(), SchemaPolicy::Abort);
        assert_eq!("skip".parse::<SchemaPolicy>().unwrap(), SchemaPolicy::SkipAndWarn);
        assert!("ignore".parse::<SchemaPolicy>().is_err());
    }
}
