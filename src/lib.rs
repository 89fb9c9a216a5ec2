//! # deckstats
//!
//! Match history statistics for a collectible card game.
//!
//! ## Architecture
//!
//! - **models**: Raw and normalized match records, grouped stats, heatmaps
//! - **normalize**: Raw JSON records to the flat game table
//! - **calculate**: Matchup and card aggregations over the game table
//! - **present**: Pivot grouped tables into heatmap matrices
//! - **fetch**: Paginated history client
//! - **storage**: Per-user snapshots, cache index and graph store (JSONL)
//! - **pipeline**: Pull-and-cache and graph-building flows
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod present;
pub mod storage;

pub use error::{AnalysisError, Result};
pub use models::*;
