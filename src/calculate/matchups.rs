//! Matchup aggregation: win rates per (player deck type, opponent deck type).

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{
    calculate_win_pct, display_label, mean, qualifying_rows, std_dev, DURATION_STDDEV_DDOF,
};
use crate::error::Result;
use crate::models::{GameTable, MatchupGroup, ModeFilter};

#[derive(Default)]
struct MatchupAccumulator {
    count: u32,
    win: u32,
    coin: u32,
    durations: Vec<f64>,
}

/// Group games by deck-type pair.
///
/// Only groups with strictly more than `game_threshold` games are kept.
/// Rows are ordered by `(p_deck_type, o_deck_type)`.
pub fn generate_matchups(
    table: &GameTable,
    mode: ModeFilter,
    game_threshold: u32,
) -> Result<Vec<MatchupGroup>> {
    let rows = qualifying_rows(table, mode, "matchups")?;

    let mut groups: BTreeMap<(&str, &str), MatchupAccumulator> = BTreeMap::new();
    for row in rows {
        let acc = groups
            .entry((row.p_deck_type.as_str(), row.o_deck_type.as_str()))
            .or_default();
        acc.count += 1;
        if row.result.is_win() {
            acc.win += 1;
        }
        if row.coin {
            acc.coin += 1;
        }
        if let Some(d) = row.duration {
            acc.durations.push(d as f64);
        }
    }

    let total_groups = groups.len();
    let matchups: Vec<MatchupGroup> = groups
        .into_iter()
        .filter(|(_, acc)| acc.count > game_threshold)
        .map(|((p_deck, o_deck), acc)| MatchupGroup {
            p_deck_type: p_deck.to_string(),
            o_deck_type: o_deck.to_string(),
            count: acc.count,
            win: acc.win,
            coin: acc.coin,
            duration_mean: mean(&acc.durations),
            duration_std: std_dev(&acc.durations, DURATION_STDDEV_DDOF),
            // count > threshold >= 0, so count is never zero here
            win_pct: calculate_win_pct(acc.win, acc.count).unwrap_or_default(),
        })
        .collect();

    debug!(
        "Matchups ({}): kept {} of {} groups above threshold {}",
        mode,
        matchups.len(),
        total_groups,
        game_threshold
    );

    Ok(matchups)
}

/// Unique player deck types across matchups that pass the threshold.
///
/// With `formatted`, underscores become spaces. The result is sorted.
pub fn unique_decks(
    table: &GameTable,
    mode: ModeFilter,
    game_threshold: u32,
    formatted: bool,
) -> Result<Vec<String>> {
    let decks: BTreeSet<String> = generate_matchups(table, mode, game_threshold)?
        .into_iter()
        .map(|m| {
            if formatted {
                display_label(&m.p_deck_type)
            } else {
                m.p_deck_type
            }
        })
        .collect();

    Ok(decks.into_iter().collect())
}
