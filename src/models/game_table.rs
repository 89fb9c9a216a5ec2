//! The normalized game table produced by the record normalizer.

use serde::{Deserialize, Serialize};

use super::{CardPlayEvent, GameMode, GameResult, MatchRecord, ModeFilter};

/// Deck name used when the tracker did not recognise an archetype.
pub const OTHER_DECK: &str = "Other";

/// Build a deck-type label: `{deck_name}_{hero_name}`.
pub fn deck_type(deck_name: &str, hero_name: &str) -> String {
    format!("{}_{}", deck_name, hero_name)
}

/// Calendar components of the `added` timestamp (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// One row of the normalized table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMatch {
    pub hero: String,
    /// Resolved deck name, never null
    pub hero_deck: String,
    pub opponent: String,
    pub opponent_deck: String,
    pub mode: GameMode,
    pub result: GameResult,
    pub duration: Option<u32>,
    pub coin: bool,
    pub added: Option<String>,
    pub card_history: Vec<CardPlayEvent>,

    /// `{hero_deck}_{hero}`
    pub p_deck_type: String,
    /// `{opponent_deck}_{opponent}`
    pub o_deck_type: String,
    /// Names of cards the player played, in order
    pub p_cards_played: Vec<String>,
    /// Names of cards the opponent played, in order
    pub o_cards_played: Vec<String>,

    /// Present when dates were split during normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateParts>,
}

impl From<&NormalizedMatch> for MatchRecord {
    fn from(row: &NormalizedMatch) -> Self {
        MatchRecord {
            hero: row.hero.clone(),
            hero_deck: Some(row.hero_deck.clone()),
            opponent: row.opponent.clone(),
            opponent_deck: Some(row.opponent_deck.clone()),
            mode: row.mode.clone(),
            result: row.result,
            duration: row.duration,
            coin: row.coin,
            added: row.added.clone(),
            card_history: row.card_history.clone(),
        }
    }
}

/// The normalized table: one row per surviving match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameTable {
    rows: Vec<NormalizedMatch>,
}

impl GameTable {
    /// Wrap already-normalized rows.
    pub fn new(rows: Vec<NormalizedMatch>) -> Self {
        Self { rows }
    }

    /// All rows, one per game.
    pub fn rows(&self) -> &[NormalizedMatch] {
        &self.rows
    }

    /// Consume the table, returning its rows.
    pub fn into_rows(self) -> Vec<NormalizedMatch> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose game mode passes `filter`.
    pub fn filter_mode(&self, filter: ModeFilter) -> impl Iterator<Item = &NormalizedMatch> {
        self.rows.iter().filter(move |row| filter.matches(&row.mode))
    }

    /// Convert back into validated records, for re-normalization.
    pub fn to_records(&self) -> Vec<MatchRecord> {
        self.rows.iter().map(MatchRecord::from).collect()
    }
}

impl FromIterator<NormalizedMatch> for GameTable {
    fn from_iter<I: IntoIterator<Item = NormalizedMatch>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
