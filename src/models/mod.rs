//! Core data models for match history analysis.

mod game_table;
mod graph;
mod ids;
mod match_record;
mod stats;

pub use game_table::*;
pub use graph::*;
pub use ids::*;
pub use match_record::*;
pub use stats::*;
