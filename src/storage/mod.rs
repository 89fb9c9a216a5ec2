//! Filesystem storage.
//!
//! Everything lives under one data directory:
//! - `snapshots/` holds one normalized game table per user, as JSONL
//! - `cache_index.json` maps user keys to their last known history size
//! - `graphs.jsonl` holds the prebuilt heatmaps

pub mod cache;
pub mod graphs;
pub mod jsonl;

pub use cache::{needs_refresh, CacheEntry, CacheIndex};
pub use graphs::GraphStore;
pub use jsonl::{JsonlReader, JsonlWriter};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn cache_index_path(&self) -> PathBuf {
        self.data_dir.join("cache_index.json")
    }

    pub fn graphs_path(&self) -> PathBuf {
        self.data_dir.join("graphs.jsonl")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
