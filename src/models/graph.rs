//! Presentation-ready heatmap structures and the graph records that store them.

use serde::{Deserialize, Serialize};

/// What a stored graph is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    Deck,
    Card,
}

impl std::fmt::Display for GraphKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphKind::Deck => write!(f, "deck"),
            GraphKind::Card => write!(f, "card"),
        }
    }
}

/// Display titles for the three heatmap axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisTitles {
    pub x: String,
    pub y: String,
    pub z: String,
}

/// Render-agnostic heatmap: `cells[y][x]`, `None` where no data exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapMatrix {
    pub title: String,
    pub axis_titles: AxisTitles,
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl HeatmapMatrix {
    /// Value at (x, y) by display label.
    pub fn get(&self, x_label: &str, y_label: &str) -> Option<Option<f64>> {
        let x = self.x_labels.iter().position(|l| l == x_label)?;
        let y = self.y_labels.iter().position(|l| l == y_label)?;
        Some(self.cells[y][x])
    }

    /// Number of cells holding a value.
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Annotation text per cell: two decimals, empty where no data.
    pub fn cell_text(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(v) => format!("{:.2}", v),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect()
    }
}

/// A heatmap stored under a name in the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: u32,
    pub name: String,
    pub kind: GraphKind,
    pub graph: HeatmapMatrix,
}
