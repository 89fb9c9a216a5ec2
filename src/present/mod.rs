//! Presentation formatter.
//!
//! Pivots a grouped table into a [`HeatmapMatrix`]: one row per unique y
//! value, one column per unique x value, the z value in each cell. Combinations
//! with no row become `None` rather than zero, so a renderer can tell
//! "no games" apart from a 0% win rate.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::calculate::display_label;
use crate::error::{AnalysisError, Result};
use crate::models::{AxisTitles, CardMatchup, CardStatGroup, HeatmapMatrix, MatchupGroup};

/// A column of a grouped table that can be used as a pivot axis or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Card,
    PlayerDeckType,
    OpponentDeckType,
    Turn,
    Win,
    Loss,
    Count,
    WinPct,
    Coin,
    DurationMean,
}

impl Field {
    /// Column name as used in grouped tables.
    pub fn column(&self) -> &'static str {
        match self {
            Field::Card => "card",
            Field::PlayerDeckType => "p_deck_type",
            Field::OpponentDeckType => "o_deck_type",
            Field::Turn => "turn",
            Field::Win => "win",
            Field::Loss => "loss",
            Field::Count => "count",
            Field::WinPct => "win%",
            Field::Coin => "coin",
            Field::DurationMean => "duration_mean",
        }
    }

    /// Human-readable axis title.
    pub fn title(&self) -> &'static str {
        match self {
            Field::Card => "Card",
            Field::PlayerDeckType => "Player Deck Name",
            Field::OpponentDeckType => "Opponent Deck Name",
            Field::Turn => "Turn",
            Field::Win => "Wins",
            Field::Loss => "Losses",
            Field::Count => "Games",
            Field::WinPct => "Win %",
            Field::Coin => "Coin",
            Field::DurationMean => "Mean Duration",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for Field {
    type Err = AnalysisError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "card" => Ok(Field::Card),
            "p_deck_type" => Ok(Field::PlayerDeckType),
            "o_deck_type" => Ok(Field::OpponentDeckType),
            "turn" => Ok(Field::Turn),
            "win" => Ok(Field::Win),
            "loss" => Ok(Field::Loss),
            "count" => Ok(Field::Count),
            "win%" => Ok(Field::WinPct),
            "coin" => Ok(Field::Coin),
            "duration_mean" => Ok(Field::DurationMean),
            other => Err(AnalysisError::UnknownField(other.to_string())),
        }
    }
}

/// Sort key for an axis label. Numeric labels sort numerically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AxisKey {
    Number(u32),
    Text(String),
}

impl AxisKey {
    fn display(&self) -> String {
        match self {
            AxisKey::Number(n) => n.to_string(),
            AxisKey::Text(s) => display_label(s),
        }
    }
}

/// A row of a grouped table that can be pivoted.
pub trait GroupedRow {
    /// Axis key for `field`, or `None` if this row type has no such column.
    fn label(&self, field: Field) -> Option<AxisKey>;

    /// Numeric value for `field`. `Some(None)` means the column exists but
    /// holds no value for this row.
    fn value(&self, field: Field) -> Option<Option<f64>>;
}

impl GroupedRow for MatchupGroup {
    fn label(&self, field: Field) -> Option<AxisKey> {
        match field {
            Field::PlayerDeckType => Some(AxisKey::Text(self.p_deck_type.clone())),
            Field::OpponentDeckType => Some(AxisKey::Text(self.o_deck_type.clone())),
            _ => None,
        }
    }

    fn value(&self, field: Field) -> Option<Option<f64>> {
        match field {
            Field::Count => Some(Some(self.count as f64)),
            Field::Win => Some(Some(self.win as f64)),
            Field::Coin => Some(Some(self.coin as f64)),
            Field::WinPct => Some(Some(self.win_pct)),
            Field::DurationMean => Some(self.duration_mean),
            _ => None,
        }
    }
}

impl GroupedRow for CardStatGroup {
    fn label(&self, field: Field) -> Option<AxisKey> {
        match field {
            Field::Card => Some(AxisKey::Text(self.card.clone())),
            Field::PlayerDeckType => Some(AxisKey::Text(self.p_deck_type.clone())),
            Field::OpponentDeckType => Some(AxisKey::Text(self.o_deck_type.clone())),
            Field::Turn => Some(AxisKey::Number(self.turn)),
            _ => None,
        }
    }

    fn value(&self, field: Field) -> Option<Option<f64>> {
        match field {
            Field::Win => Some(Some(self.win as f64)),
            Field::Loss => Some(Some(self.loss as f64)),
            Field::WinPct => Some(Some(self.win_pct)),
            Field::Turn => Some(Some(self.turn as f64)),
            _ => None,
        }
    }
}

impl GroupedRow for CardMatchup {
    fn label(&self, field: Field) -> Option<AxisKey> {
        match field {
            Field::Card => Some(AxisKey::Text(self.card.clone())),
            Field::PlayerDeckType => Some(AxisKey::Text(self.p_deck_type.clone())),
            Field::OpponentDeckType => Some(AxisKey::Text(self.o_deck_type.clone())),
            _ => None,
        }
    }

    fn value(&self, field: Field) -> Option<Option<f64>> {
        match field {
            Field::Win => Some(Some(self.win as f64)),
            Field::Loss => Some(Some(self.loss as f64)),
            Field::WinPct => Some(Some(self.win_pct)),
            _ => None,
        }
    }
}

/// Pivot `rows` into a heatmap with `x` columns, `y` rows and `z` cells.
///
/// Both label sets are sorted and shown with underscores replaced by spaces.
/// Two rows landing on the same cell is an error.
pub fn heatmap<R: GroupedRow>(
    rows: &[R],
    x: Field,
    y: Field,
    z: Field,
    title: impl Into<String>,
) -> Result<HeatmapMatrix> {
    let unknown = |field: Field| AnalysisError::UnknownField(field.column().to_string());

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let x_key = row.label(x).ok_or_else(|| unknown(x))?;
        let y_key = row.label(y).ok_or_else(|| unknown(y))?;
        let z_val = row.value(z).ok_or_else(|| unknown(z))?;
        points.push((x_key, y_key, z_val));
    }

    let x_keys: BTreeSet<&AxisKey> = points.iter().map(|(x, _, _)| x).collect();
    let y_keys: BTreeSet<&AxisKey> = points.iter().map(|(_, y, _)| y).collect();
    let x_index: BTreeMap<&AxisKey, usize> = x_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let y_index: BTreeMap<&AxisKey, usize> = y_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    let mut cells = vec![vec![None; x_keys.len()]; y_keys.len()];
    let mut seen = vec![vec![false; x_keys.len()]; y_keys.len()];
    for (x_key, y_key, z_val) in &points {
        let (xi, yi) = (x_index[x_key], y_index[y_key]);
        if seen[yi][xi] {
            return Err(AnalysisError::DuplicateCell {
                x: x_key.display(),
                y: y_key.display(),
            });
        }
        seen[yi][xi] = true;
        cells[yi][xi] = *z_val;
    }

    Ok(HeatmapMatrix {
        title: title.into(),
        axis_titles: AxisTitles {
            x: x.title().to_string(),
            y: y.title().to_string(),
            z: z.title().to_string(),
        },
        x_labels: x_keys.iter().map(|k| k.display()).collect(),
        y_labels: y_keys.iter().map(|k| k.display()).collect(),
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matchup(p: &str, o: &str, win_pct: f64) -> MatchupGroup {
        MatchupGroup {
            p_deck_type: p.to_string(),
            o_deck_type: o.to_string(),
            count: 4,
            win: 2,
            coin: 1,
            duration_mean: None,
            duration_std: None,
            win_pct,
        }
    }

    fn card_stat(card: &str, turn: u32, win: u32, loss: u32) -> CardStatGroup {
        CardStatGroup {
            card: card.to_string(),
            p_deck_type: "Tempo_Mage".to_string(),
            o_deck_type: "Control_Warrior".to_string(),
            turn,
            win,
            loss,
            win_pct: win as f64 / (win + loss) as f64,
        }
    }

    #[test]
    fn test_missing_combination_is_none_not_zero() {
        let rows = vec![
            matchup("Tempo_Mage", "Control_Warrior", 50.0),
            matchup("Tempo_Mage", "Zoo_Warlock", 0.0),
            matchup("Zoo_Warlock", "Control_Warrior", 75.0),
        ];

        let m = heatmap(
            &rows,
            Field::OpponentDeckType,
            Field::PlayerDeckType,
            Field::WinPct,
            "Matchups",
        )
        .unwrap();

        assert_eq!(m.x_labels, vec!["Control Warrior", "Zoo Warlock"]);
        assert_eq!(m.y_labels, vec!["Tempo Mage", "Zoo Warlock"]);
        assert_eq!(m.cells[0], vec![Some(50.0), Some(0.0)]);
        assert_eq!(m.cells[1], vec![Some(75.0), None]);
        assert_eq!(m.get("Zoo Warlock", "Zoo Warlock"), Some(None));
    }

    #[test]
    fn test_axis_titles_from_lookup() {
        let rows = vec![matchup("Tempo_Mage", "Control_Warrior", 50.0)];
        let m = heatmap(
            &rows,
            Field::OpponentDeckType,
            Field::PlayerDeckType,
            Field::WinPct,
            "Matchups",
        )
        .unwrap();

        assert_eq!(m.title, "Matchups");
        assert_eq!(m.axis_titles.x, "Opponent Deck Name");
        assert_eq!(m.axis_titles.y, "Player Deck Name");
        assert_eq!(m.axis_titles.z, "Win %");
    }

    #[test]
    fn test_turns_sort_numerically() {
        let rows = vec![
            card_stat("Fireball", 10, 1, 1),
            card_stat("Fireball", 2, 1, 0),
            card_stat("Fireball", 9, 0, 1),
        ];
        let m = heatmap(&rows, Field::Turn, Field::Card, Field::WinPct, "Fireball").unwrap();

        assert_eq!(m.x_labels, vec!["2", "9", "10"]);
        assert_eq!(m.cells[0], vec![Some(1.0), Some(0.0), Some(0.5)]);
    }

    #[test]
    fn test_duplicate_cell_is_error() {
        let rows = vec![card_stat("Fireball", 2, 1, 0), card_stat("Fireball", 4, 0, 1)];
        let err = heatmap(
            &rows,
            Field::OpponentDeckType,
            Field::PlayerDeckType,
            Field::WinPct,
            "Fireball",
        )
        .unwrap_err();

        assert!(matches!(err, AnalysisError::DuplicateCell { .. }));
    }

    #[test]
    fn test_unknown_field_for_row_type() {
        let rows = vec![matchup("Tempo_Mage", "Control_Warrior", 50.0)];
        let err = heatmap(&rows, Field::Card, Field::PlayerDeckType, Field::WinPct, "x").unwrap_err();
        match err {
            AnalysisError::UnknownField(name) => assert_eq!(name, "card"),
            other => panic!("expected unknown field, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_value_column_stays_none() {
        let rows = vec![matchup("Tempo_Mage", "Control_Warrior", 50.0)];
        let m = heatmap(
            &rows,
            Field::OpponentDeckType,
            Field::PlayerDeckType,
            Field::DurationMean,
            "Durations",
        )
        .unwrap();
        assert_eq!(m.cells, vec![vec![None]]);
    }

    #[test]
    fn test_empty_rows_give_empty_matrix() {
        let rows: Vec<MatchupGroup> = Vec::new();
        let m = heatmap(&rows, Field::OpponentDeckType, Field::PlayerDeckType, Field::WinPct, "x")
            .unwrap();
        assert!(m.x_labels.is_empty());
        assert!(m.cells.is_empty());
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("win%".parse::<Field>().unwrap(), Field::WinPct);
        assert_eq!("p_deck_type".parse::<Field>().unwrap(), Field::PlayerDeckType);
        assert!(matches!(
            "winrate".parse::<Field>(),
            Err(AnalysisError::UnknownField(_))
        ));
    }
}
