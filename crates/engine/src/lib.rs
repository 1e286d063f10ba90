//! Streamrec Engine - Item-based collaborative filtering over watch events
//!
//! This crate turns raw viewing events into an immutable [`Snapshot`]
//! (interaction matrix, item similarity matrix and popularity ranking) and
//! answers recommendation queries against it.
//!
//! Pipeline: events → [`InteractionAggregator`] → [`InteractionMatrix`] →
//! [`SimilarityMatrix`] → [`GenerateRecommendations`], with
//! [`PopularityRanking`] built from the same aggregation for fallbacks.

pub mod aggregator;
pub mod config;
pub mod dataset;
pub mod error;
pub mod explain;
pub mod matrix;
pub mod popularity;
pub mod recommendation;
pub mod server;
pub mod similarity;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod weights;

// Re-export key types
pub use aggregator::{Aggregation, BuildDiagnostics, InteractionAggregator, PairScore};
pub use crate::config::{EngineConfig, DEFAULT_K, MAX_K};
pub use dataset::{CleansingReport, Dataset, FileReport};
pub use error::{EngineError, Result};
pub use explain::{Attribution, Contribution, ExplainRecommendation, ScoreBreakdown};
pub use matrix::{IdIndex, InteractionMatrix};
pub use popularity::{BlendWeights, PopularityRanking, PopularityReducer};
pub use recommendation::{GenerateRecommendations, RankPopularItems, RecommendOptions};
pub use similarity::SimilarityMatrix;
pub use snapshot::{BuildSnapshot, HistoryEntry, Snapshot, SnapshotStats, UserActivity, WatchEvent};
pub use store::{Publication, SnapshotStore};
pub use types::*;
pub use weights::{EventWeightPolicy, UnknownEventKindPolicy, DEFAULT_EVENT_WEIGHTS};

#[cfg(test)]
mod tests;
