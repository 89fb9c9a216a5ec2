//! Statistics calculation engine.
//!
//! Computes grouped metrics from a normalized [`GameTable`]:
//! - Matchup win rates and duration stats per deck-type pair
//! - Per-card win/loss totals for both sides of the board
//! - Per-card win rates by deck pair and turn
//!
//! Every function here takes the table by reference and returns a new
//! result, so one table can feed any number of calls.
//!
//! [`GameTable`]: crate::models::GameTable

pub mod cards;
pub mod matchups;

pub use cards::*;
pub use matchups::*;

use crate::error::{AnalysisError, Result};
use crate::models::{GameTable, ModeFilter, NormalizedMatch};

/// Delta degrees of freedom for the duration standard deviation.
///
/// `1` gives the sample standard deviation (divide by `n - 1`).
pub const DURATION_STDDEV_DDOF: usize = 1;

/// Rows passing the mode filter; fails when none qualify.
pub(crate) fn qualifying_rows<'a>(
    table: &'a GameTable,
    mode: ModeFilter,
    stage: &'static str,
) -> Result<Vec<&'a NormalizedMatch>> {
    let rows: Vec<_> = table.filter_mode(mode).collect();
    if rows.is_empty() {
        return Err(AnalysisError::EmptyResult {
            stage,
            mode: mode.to_string(),
        });
    }
    Ok(rows)
}

/// Calculate win percentage (0-100) from wins and games played.
pub fn calculate_win_pct(wins: u32, games: u32) -> Option<f64> {
    if games == 0 {
        None
    } else {
        Some(wins as f64 / games as f64 * 100.0)
    }
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// Returns `None` when `values.len() <= ddof`.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - ddof) as f64).sqrt())
}

/// Replace underscores with spaces for display.
pub fn display_label(label: &str) -> String {
    label.replace('_', " ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{
        deck_type, CardPlayEvent, GameMode, GameResult, GameTable, NormalizedMatch, Side,
    };

    /// Build a normalized row from (deck, hero) pairs and card plays.
    pub(crate) fn game(
        player: (&str, &str),
        opponent: (&str, &str),
        mode: GameMode,
        result: GameResult,
        duration: Option<u32>,
        plays: &[(&str, Side, u32)],
    ) -> NormalizedMatch {
        let card_history: Vec<CardPlayEvent> = plays
            .iter()
            .map(|(name, side, turn)| CardPlayEvent::new(*name, *side, *turn))
            .collect();
        let names = |side: Side| {
            card_history
                .iter()
                .filter(|e| e.player == side)
                .map(|e| e.card_name.clone())
                .collect::<Vec<_>>()
        };

        NormalizedMatch {
            hero: player.1.to_string(),
            hero_deck: player.0.to_string(),
            opponent: opponent.1.to_string(),
            opponent_deck: opponent.0.to_string(),
            mode,
            result,
            duration,
            coin: false,
            added: None,
            p_deck_type: deck_type(player.0, player.1),
            o_deck_type: deck_type(opponent.0, opponent.1),
            p_cards_played: names(Side::Me),
            o_cards_played: names(Side::Opponent),
            card_history: card_history.clone(),
            date: None,
        }
    }

    pub(crate) fn table(rows: Vec<NormalizedMatch>) -> GameTable {
        GameTable::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_win_pct() {
        assert_eq!(calculate_win_pct(3, 4), Some(75.0));
        assert_eq!(calculate_win_pct(0, 5), Some(0.0));
        assert_eq!(calculate_win_pct(0, 0), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_sample_std_dev() {
        // Sample std of [2, 4, 4, 4, 5, 5, 7, 9] is sqrt(32 / 7)
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = std_dev(&values, DURATION_STDDEV_DDOF).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);

        // Population convention for comparison
        let pop = std_dev(&values, 0).unwrap();
        assert!((pop - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_std_dev_needs_more_than_ddof_values() {
        assert_eq!(std_dev(&[5.0], DURATION_STDDEV_DDOF), None);
        assert_eq!(std_dev(&[5.0], 0), Some(0.0));
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("Tempo_Mage"), "Tempo Mage");
        assert_eq!(display_label("Other_Secret_Paladin"), "Other Secret Paladin");
    }
}
