//! Grouped statistics produced by the aggregators.

use serde::{Deserialize, Serialize};

/// Win/loss tally with a derived rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLoss {
    pub win: u32,
    pub loss: u32,
}

impl WinLoss {
    pub fn record(&mut self, won: bool) {
        if won {
            self.win += 1;
        } else {
            self.loss += 1;
        }
    }

    pub fn merge(&mut self, other: WinLoss) {
        self.win += other.win;
        self.loss += other.loss;
    }

    pub fn total(&self) -> u32 {
        self.win + self.loss
    }

    /// Win fraction in `[0, 1]`, or `None` when no games were decided.
    pub fn win_fraction(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.win as f64 / total as f64),
        }
    }
}

/// Aggregate for one (player deck type, opponent deck type) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupGroup {
    pub p_deck_type: String,
    pub o_deck_type: String,

    /// Games played in this matchup
    pub count: u32,

    /// Games won
    pub win: u32,

    /// Games where the player had the coin
    pub coin: u32,

    /// Mean game length, if any durations were reported
    pub duration_mean: Option<f64>,

    /// Sample standard deviation of game length
    pub duration_std: Option<f64>,

    /// `win / count * 100`
    #[serde(rename = "win%")]
    pub win_pct: f64,
}

/// Card win/loss total for one card name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTally {
    pub card: String,
    pub win: u32,
    pub loss: u32,
}

/// Per-card totals from both sides of the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTotals {
    /// Cards the player played, credited with the game's result
    pub player: Vec<CardTally>,
    /// Cards the opponent played, credited with the inverse result
    pub opponent: Vec<CardTally>,
}

impl CardTotals {
    /// Look up the player-side tally for a card.
    pub fn player_card(&self, card: &str) -> Option<&CardTally> {
        self.player.iter().find(|t| t.card == card)
    }

    /// Look up the opponent-side tally for a card.
    pub fn opponent_card(&self, card: &str) -> Option<&CardTally> {
        self.opponent.iter().find(|t| t.card == card)
    }

    /// Merge both sides by card name, sorted by card.
    pub fn combined(&self) -> Vec<CardTally> {
        let mut merged: std::collections::BTreeMap<&str, WinLoss> = Default::default();
        for tally in self.player.iter().chain(self.opponent.iter()) {
            merged.entry(tally.card.as_str()).or_default().merge(WinLoss {
                win: tally.win,
                loss: tally.loss,
            });
        }
        merged
            .into_iter()
            .map(|(card, wl)| CardTally {
                card: card.to_string(),
                win: wl.win,
                loss: wl.loss,
            })
            .collect()
    }
}

/// Card aggregate keyed by (card, deck that played it, deck it was played against, turn).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStatGroup {
    pub card: String,
    pub p_deck_type: String,
    pub o_deck_type: String,
    pub turn: u32,
    pub win: u32,
    pub loss: u32,
    /// `win / (win + loss)`, in `[0, 1]`
    #[serde(rename = "win%")]
    pub win_pct: f64,
}

/// Card aggregate keyed by (card, player deck type, opponent deck type).
///
/// Produced by the decklist-matchup pass and by collapsing card stats
/// across turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMatchup {
    pub card: String,
    pub p_deck_type: String,
    pub o_deck_type: String,
    pub win: u32,
    pub loss: u32,
    #[serde(rename = "win%")]
    pub win_pct: f64,
}
