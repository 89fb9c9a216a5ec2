//! Prebuilt heatmap store.

use std::path::PathBuf;

use tracing::debug;

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::calculate::display_label;
use crate::models::{GraphKind, GraphRecord, HeatmapMatrix};

/// Named heatmaps kept in a single JSONL file.
#[derive(Debug, Clone)]
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    /// Graph store backed by the configured graphs file.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.graphs_path(),
        }
    }

    /// Replace every stored graph with `records`.
    pub fn replace_all(&self, records: &[GraphRecord]) -> Result<usize, StorageError> {
        JsonlWriter::new(self.path.clone()).write_all(records)
    }

    /// Every stored graph, in file order.
    pub fn all(&self) -> Result<Vec<GraphRecord>, StorageError> {
        JsonlReader::new(self.path.clone()).read_all()
    }

    /// Heatmap stored under `name`.
    ///
    /// Deck graphs are stored under their underscored deck type, so a
    /// display name like "Tempo Mage" also finds "Tempo_Mage".
    pub fn get(&self, name: &str) -> Result<Option<HeatmapMatrix>, StorageError> {
        let records = self.all()?;
        let found = records
            .iter()
            .position(|r| r.name == name)
            .or_else(|| {
                records
                    .iter()
                    .position(|r| r.kind == GraphKind::Deck && display_label(&r.name) == name)
            });

        debug!("Graph lookup {:?}: found={}", name, found.is_some());
        Ok(found.map(|idx| records[idx].graph.clone()))
    }

    /// Names of stored graphs as `(decks, cards)`.
    ///
    /// Deck names are shown with spaces; card names are kept as stored.
    pub fn name_lists(&self) -> Result<(Vec<String>, Vec<String>), StorageError> {
        let mut decks = Vec::new();
        let mut cards = Vec::new();
        for record in self.all()? {
            match record.kind {
                GraphKind::Deck => decks.push(display_label(&record.name)),
                GraphKind::Card => cards.push(record.name),
            }
        }
        Ok((decks, cards))
    }
}
