//! End-to-end flows over the core: pull and cache a user's history, build
//! the stored heatmaps, and load history exported to a file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculate::{
    collapse_turns, display_label, generate_card_stats, generate_decklist_matchups, unique_decks,
};
use crate::error::AnalysisError;
use crate::fetch::{
    fetch_page_with_retry, fetch_remaining, Credentials, FetchError, HistoryProvider, RetryPolicy,
};
use crate::models::{GameTable, GraphKind, GraphRecord, ModeFilter, UserKey};
use crate::normalize::{normalize, NormalizeOptions};
use crate::present::{heatmap, Field};
use crate::storage::cache::{read_snapshot, snapshot_path, write_snapshot};
use crate::storage::{needs_refresh, CacheIndex, StorageConfig, StorageError};

/// Errors from the end-to-end flows.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No match history found in {0:?}")]
    UnknownLayout(PathBuf),
}

/// Result of [`refresh_user`].
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub table: GameTable,
    /// True when the history was refetched rather than read from the snapshot
    pub refreshed: bool,
    pub total_items: u64,
}

/// Bring a user's normalized table up to date.
///
/// Page 1 is always fetched for its item count. When the count matches the
/// cache index and the snapshot is on disk, the snapshot is returned;
/// otherwise the remaining pages are fetched, normalized and cached.
pub async fn refresh_user<P>(
    provider: &P,
    storage: &StorageConfig,
    credentials: &Credentials,
    options: &NormalizeOptions,
    policy: RetryPolicy,
) -> Result<RefreshOutcome, PipelineError>
where
    P: HistoryProvider + ?Sized,
{
    let key = UserKey::derive(&credentials.username, &credentials.token);
    let first = fetch_page_with_retry(provider, 1, policy).await?;
    let fresh_total = first.meta.total_items;

    let mut index = CacheIndex::load(storage)?;
    let entry = index.lookup(&key).clone();
    let snapshot_exists = snapshot_path(storage, &entry).exists();

    if !needs_refresh(fresh_total, entry.total_items, snapshot_exists) {
        match read_snapshot(storage, &entry) {
            Ok(table) => {
                info!(
                    "History for {} unchanged ({} items), using snapshot",
                    credentials.username, fresh_total
                );
                return Ok(RefreshOutcome {
                    table,
                    refreshed: false,
                    total_items: fresh_total,
                });
            }
            Err(StorageError::Json(e)) => {
                warn!(
                    "Snapshot {} is corrupt ({}), refetching",
                    entry.snapshot_file, e
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "Refreshing history for {}: {} items (cached {}, snapshot present: {})",
        credentials.username, fresh_total, entry.total_items, snapshot_exists
    );

    let raw = fetch_remaining(provider, first, policy).await?;
    let report = normalize(&raw.records, options)?;
    write_snapshot(storage, &entry, &report.table)?;
    index.update_count(&key, raw.total_items);
    index.save()?;

    Ok(RefreshOutcome {
        table: report.table,
        refreshed: true,
        total_items: raw.total_items,
    })
}

/// Settings for [`build_graphs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSettings {
    pub mode: ModeFilter,
    pub threshold: u32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            mode: ModeFilter::Ranked,
            threshold: 5,
        }
    }
}

/// Build one heatmap per qualifying deck and one per card.
///
/// Deck graphs show each card's win rate against each opponent deck. Card
/// graphs show the card's win rate for each deck pairing, summed over turns.
/// Ids are sequential, decks first.
pub fn build_graphs(
    table: &GameTable,
    settings: GraphSettings,
) -> Result<Vec<GraphRecord>, AnalysisError> {
    let GraphSettings { mode, threshold } = settings;
    let mut records = Vec::new();

    let decks = unique_decks(table, mode, threshold, false)?;
    let decklists = generate_decklist_matchups(table, mode, threshold)?;
    for deck in decks {
        let rows: Vec<_> = decklists
            .iter()
            .filter(|m| m.p_deck_type == deck)
            .cloned()
            .collect();
        let graph = heatmap(
            &rows,
            Field::OpponentDeckType,
            Field::Card,
            Field::WinPct,
            format!("Win % of Cards in {}", display_label(&deck)),
        )?;
        records.push(GraphRecord {
            id: records.len() as u32,
            name: deck,
            kind: GraphKind::Deck,
            graph,
        });
    }

    let collapsed = collapse_turns(&generate_card_stats(table, mode, threshold)?);
    let cards: BTreeSet<&str> = collapsed.iter().map(|m| m.card.as_str()).collect();
    for card in cards {
        let rows: Vec<_> = collapsed
            .iter()
            .filter(|m| m.card == card)
            .cloned()
            .collect();
        let graph = heatmap(
            &rows,
            Field::OpponentDeckType,
            Field::PlayerDeckType,
            Field::WinPct,
            format!("Win % of {}", card),
        )?;
        records.push(GraphRecord {
            id: records.len() as u32,
            name: card.to_string(),
            kind: GraphKind::Card,
            graph,
        });
    }

    debug!("Built {} graphs", records.len());
    Ok(records)
}

/// Read raw match records from an exported JSON file.
///
/// Accepts a page as returned by the API (`{"history": [...]}`), a cached
/// export (`{"children": [...]}`), or a bare array of records.
pub fn load_history_file(path: &Path) -> Result<Vec<Value>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut obj) => match obj.remove("history").or_else(|| obj.remove("children")) {
            Some(Value::Array(records)) => records,
            _ => return Err(PipelineError::UnknownLayout(path.to_path_buf())),
        },
        _ => return Err(PipelineError::UnknownLayout(path.to_path_buf())),
    };

    debug!("Loaded {} raw records from {:?}", records.len(), path);
    Ok(records)
}
