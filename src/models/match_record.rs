//! Raw match records as reported by the history provider.
//!
//! Records arrive as loosely typed JSON objects. `MatchRecord::from_value`
//! validates one object into typed fields so later stages never look up
//! fields by name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AnalysisError, Result};

/// Outcome of a game from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
}

impl GameResult {
    /// The same game seen from the other side of the board.
    pub fn inverse(self) -> Self {
        match self {
            GameResult::Win => GameResult::Loss,
            GameResult::Loss => GameResult::Win,
        }
    }

    pub fn is_win(self) -> bool {
        matches!(self, GameResult::Win)
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Win => write!(f, "win"),
            GameResult::Loss => write!(f, "loss"),
        }
    }
}

impl FromStr for GameResult {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "win" => Ok(GameResult::Win),
            "loss" => Ok(GameResult::Loss),
            other => Err(format!("expected \"win\" or \"loss\", got {:?}", other)),
        }
    }
}

/// Queue the game was played in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameMode {
    Ranked,
    Casual,
    Arena,
    Friendly,
    Practice,
    Other(String),
}

impl GameMode {
    pub fn as_str(&self) -> &str {
        match self {
            GameMode::Ranked => "ranked",
            GameMode::Casual => "casual",
            GameMode::Arena => "arena",
            GameMode::Friendly => "friendly",
            GameMode::Practice => "practice",
            GameMode::Other(s) => s,
        }
    }
}

impl From<String> for GameMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ranked" => GameMode::Ranked,
            "casual" => GameMode::Casual,
            "arena" => GameMode::Arena,
            "friendly" => GameMode::Friendly,
            "practice" => GameMode::Practice,
            _ => GameMode::Other(s),
        }
    }
}

impl From<GameMode> for String {
    fn from(mode: GameMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Game-mode filter applied before any aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeFilter {
    #[default]
    Ranked,
    Casual,
    Both,
}

impl ModeFilter {
    /// Returns true if a game in `mode` passes this filter.
    pub fn matches(&self, mode: &GameMode) -> bool {
        match self {
            ModeFilter::Ranked => *mode == GameMode::Ranked,
            ModeFilter::Casual => *mode == GameMode::Casual,
            ModeFilter::Both => true,
        }
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeFilter::Ranked => write!(f, "ranked"),
            ModeFilter::Casual => write!(f, "casual"),
            ModeFilter::Both => write!(f, "both"),
        }
    }
}

impl FromStr for ModeFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ranked" => Ok(ModeFilter::Ranked),
            "casual" => Ok(ModeFilter::Casual),
            "both" => Ok(ModeFilter::Both),
            other => Err(format!(
                "unknown game mode {:?} (expected ranked, casual or both)",
                other
            )),
        }
    }
}

/// Which side of the board played a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Me,
    Opponent,
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "me" => Ok(Side::Me),
            "opponent" => Ok(Side::Opponent),
            other => Err(format!("expected \"me\" or \"opponent\", got {:?}", other)),
        }
    }
}

/// A single card played during a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPlayEvent {
    pub card_name: String,
    pub player: Side,
    pub turn: u32,
}

impl CardPlayEvent {
    pub fn new(card_name: impl Into<String>, player: Side, turn: u32) -> Self {
        Self {
            card_name: card_name.into(),
            player,
            turn,
        }
    }
}

/// One played game, validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Player's hero class
    pub hero: String,

    /// Player's deck archetype, if the tracker recognised one
    pub hero_deck: Option<String>,

    /// Opponent's hero class
    pub opponent: String,

    /// Opponent's deck archetype, if recognised
    pub opponent_deck: Option<String>,

    pub mode: GameMode,

    pub result: GameResult,

    /// Game length in seconds
    pub duration: Option<u32>,

    /// Whether the player went second and received the coin
    pub coin: bool,

    /// Raw `added` timestamp, parsed only when dates are split
    pub added: Option<String>,

    /// Cards played by both sides, in play order
    pub card_history: Vec<CardPlayEvent>,
}

impl MatchRecord {
    /// Validate a raw JSON record. `index` is used in error messages.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| AnalysisError::malformed(index, "record", "expected a JSON object"))?;

        let result = required_str(index, obj, "result")?
            .parse::<GameResult>()
            .map_err(|e| AnalysisError::malformed(index, "result", e))?;

        let duration = match obj.get("duration") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|d| u32::try_from(d).ok())
                    .ok_or_else(|| {
                        AnalysisError::malformed(index, "duration", "expected a whole number")
                    })?,
            ),
        };

        let coin = match obj.get("coin") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(AnalysisError::malformed(index, "coin", "expected a boolean")),
        };

        let card_history = match obj.get("card_history") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(n, entry)| parse_card_event(index, n, entry))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(AnalysisError::malformed(
                    index,
                    "card_history",
                    "expected an array",
                ))
            }
        };

        Ok(Self {
            hero: required_str(index, obj, "hero")?.to_string(),
            hero_deck: optional_str(index, obj, "hero_deck")?,
            opponent: required_str(index, obj, "opponent")?.to_string(),
            opponent_deck: optional_str(index, obj, "opponent_deck")?,
            mode: GameMode::from(required_str(index, obj, "mode")?.to_string()),
            result,
            duration,
            coin,
            added: optional_str(index, obj, "added")?,
            card_history,
        })
    }
}

fn required_str<'a>(index: usize, obj: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(AnalysisError::missing(index, field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(AnalysisError::malformed(index, field, "expected a string")),
    }
}

fn optional_str(index: usize, obj: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AnalysisError::malformed(index, field, "expected a string")),
    }
}

/// Parse one `card_history` entry: `{"card": {"name": ..}, "player": .., "turn": ..}`.
fn parse_card_event(index: usize, n: usize, entry: &Value) -> Result<CardPlayEvent> {
    let path = |field: &str| format!("card_history[{}].{}", n, field);

    let card_name = entry
        .get("card")
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::missing(index, path("card.name")))?;

    let player = entry
        .get("player")
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::missing(index, path("player")))?
        .parse::<Side>()
        .map_err(|e| AnalysisError::malformed(index, path("player"), e))?;

    let turn = match entry.get("turn") {
        None | Some(Value::Null) => return Err(AnalysisError::missing(index, path("turn"))),
        Some(v) => v
            .as_u64()
            .and_then(|t| u32::try_from(t).ok())
            .ok_or_else(|| AnalysisError::malformed(index, path("turn"), "expected a whole number"))?,
    };

    Ok(CardPlayEvent::new(card_name, player, turn))
}
