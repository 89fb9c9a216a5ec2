//! Card statistics: per-card totals and per-card/deck/turn win rates.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::qualifying_rows;
use crate::error::Result;
use crate::models::{
    CardMatchup, CardStatGroup, CardTally, CardTotals, GameTable, ModeFilter, Side, WinLoss,
};

/// Win/loss totals per card name, one table per side of the board.
///
/// Player cards are credited with the game's result; opponent cards with the
/// inverse, since the opponent won whenever the player lost.
pub fn card_totals(table: &GameTable, mode: ModeFilter) -> Result<CardTotals> {
    let rows = qualifying_rows(table, mode, "card totals")?;

    let mut player: BTreeMap<&str, WinLoss> = BTreeMap::new();
    let mut opponent: BTreeMap<&str, WinLoss> = BTreeMap::new();

    for row in rows {
        for card in &row.p_cards_played {
            player.entry(card.as_str()).or_default().record(row.result.is_win());
        }
        for card in &row.o_cards_played {
            opponent
                .entry(card.as_str())
                .or_default()
                .record(row.result.inverse().is_win());
        }
    }

    let into_tallies = |map: BTreeMap<&str, WinLoss>| -> Vec<CardTally> {
        map.into_iter()
            .map(|(card, wl)| CardTally {
                card: card.to_string(),
                win: wl.win,
                loss: wl.loss,
            })
            .collect()
    };

    Ok(CardTotals {
        player: into_tallies(player),
        opponent: into_tallies(opponent),
    })
}

/// Win rates per (card, deck that played it, deck it faced, turn).
///
/// When the opponent played a card the deck labels are swapped, so
/// `p_deck_type` is always the deck that played the card. The win/loss flag
/// is the game's recorded result. Rows need strictly more than
/// `game_threshold` plays.
pub fn generate_card_stats(
    table: &GameTable,
    mode: ModeFilter,
    game_threshold: u32,
) -> Result<Vec<CardStatGroup>> {
    let rows = qualifying_rows(table, mode, "card stats")?;

    let mut groups: BTreeMap<(&str, &str, &str, u32), WinLoss> = BTreeMap::new();
    for row in rows {
        for event in &row.card_history {
            let (played_by, played_against) = match event.player {
                Side::Me => (&row.p_deck_type, &row.o_deck_type),
                Side::Opponent => (&row.o_deck_type, &row.p_deck_type),
            };
            groups
                .entry((
                    event.card_name.as_str(),
                    played_by.as_str(),
                    played_against.as_str(),
                    event.turn,
                ))
                .or_default()
                .record(row.result.is_win());
        }
    }

    let total_groups = groups.len();
    let stats: Vec<CardStatGroup> = groups
        .into_iter()
        .filter(|(_, wl)| wl.total() > game_threshold)
        .filter_map(|((card, p_deck, o_deck, turn), wl)| {
            Some(CardStatGroup {
                card: card.to_string(),
                p_deck_type: p_deck.to_string(),
                o_deck_type: o_deck.to_string(),
                turn,
                win: wl.win,
                loss: wl.loss,
                win_pct: wl.win_fraction()?,
            })
        })
        .collect();

    debug!(
        "Card stats ({}): kept {} of {} card/deck/turn groups above threshold {}",
        mode,
        stats.len(),
        total_groups,
        game_threshold
    );

    Ok(stats)
}

/// Win rates per (card, player deck type, opponent deck type) for cards the
/// player played.
pub fn generate_decklist_matchups(
    table: &GameTable,
    mode: ModeFilter,
    game_threshold: u32,
) -> Result<Vec<CardMatchup>> {
    let rows = qualifying_rows(table, mode, "decklist matchups")?;

    let mut groups: BTreeMap<(&str, &str, &str), WinLoss> = BTreeMap::new();
    for row in rows {
        for card in &row.p_cards_played {
            groups
                .entry((card.as_str(), row.p_deck_type.as_str(), row.o_deck_type.as_str()))
                .or_default()
                .record(row.result.is_win());
        }
    }

    Ok(finish_card_matchups(groups, game_threshold))
}

/// Sum card stats across turns and recompute the win rate.
pub fn collapse_turns(stats: &[CardStatGroup]) -> Vec<CardMatchup> {
    let mut groups: BTreeMap<(&str, &str, &str), WinLoss> = BTreeMap::new();
    for stat in stats {
        groups
            .entry((
                stat.card.as_str(),
                stat.p_deck_type.as_str(),
                stat.o_deck_type.as_str(),
            ))
            .or_default()
            .merge(WinLoss {
                win: stat.win,
                loss: stat.loss,
            });
    }
    finish_card_matchups(groups, 0)
}

/// Unique card names in the card stats table, sorted.
pub fn unique_cards(
    table: &GameTable,
    mode: ModeFilter,
    game_threshold: u32,
) -> Result<Vec<String>> {
    let cards: BTreeSet<String> = generate_card_stats(table, mode, game_threshold)?
        .into_iter()
        .map(|s| s.card)
        .collect();
    Ok(cards.into_iter().collect())
}

fn finish_card_matchups(
    groups: BTreeMap<(&str, &str, &str), WinLoss>,
    game_threshold: u32,
) -> Vec<CardMatchup> {
    groups
        .into_iter()
        .filter(|(_, wl)| wl.total() > game_threshold)
        .filter_map(|((card, p_deck, o_deck), wl)| {
            Some(CardMatchup {
                card: card.to_string(),
                p_deck_type: p_deck.to_string(),
                o_deck_type: o_deck.to_string(),
                win: wl.win,
                loss: wl.loss,
                win_pct: wl.win_fraction()?,
            })
        })
        .collect()
}
