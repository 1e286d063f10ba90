//! Immutable engine snapshot
//!
//! A snapshot bundles everything a query needs: catalog metadata, the
//! interaction matrix, the item similarity matrix, the popularity ranking and
//! each user's raw watch events.
//! It is built wholesale from a full event set and never mutated afterwards;
//! a refresh builds a new snapshot and swaps it in through
//! [`crate::store::SnapshotStore`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

use crate::aggregator::{BuildDiagnostics, InteractionAggregator};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::explain::{Attribution, ExplainRecommendation, ScoreBreakdown};
use crate::matrix::InteractionMatrix;
use crate::popularity::PopularityRanking;
use crate::recommendation::{GenerateRecommendations, RankPopularItems, RecommendOptions};
use crate::similarity::SimilarityMatrix;
use crate::types::{Event, Item, ItemId, PopularItem, RecommendationList, User, UserId};

/// Size summary of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub users: usize,
    pub items: usize,
    /// Non-zero cells of the interaction matrix
    pub interactions: usize,
}

/// One entry of a user's interaction history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub item_id: ItemId,
    pub score: f64,
}

/// One raw event in a user's watch history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchEvent {
    pub item_id: ItemId,
    pub event_type: String,
    pub watch_seconds: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl WatchEvent {
    /// Longest watch first, then most recent, then item id
    fn display_order(a: &Self, b: &Self) -> Ordering {
        b.watch_seconds
            .total_cmp(&a.watch_seconds)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
            .then_with(|| a.item_id.cmp(&b.item_id))
            .then_with(|| a.event_type.cmp(&b.event_type))
    }
}

/// A user's raw events as loaded, regardless of whether they were scored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivity {
    pub user_id: UserId,
    pub total_events: usize,
    /// Up to the requested number of events, longest watch first
    pub events: Vec<WatchEvent>,
}

/// Fully built, read-only recommendation state
#[derive(Debug, Clone)]
pub struct Snapshot {
    catalog: HashMap<ItemId, Item>,
    activity: HashMap<UserId, Vec<WatchEvent>>,
    interactions: InteractionMatrix,
    similarity: SimilarityMatrix,
    popularity: PopularityRanking,
    diagnostics: BuildDiagnostics,
    stats: SnapshotStats,
    default_k: usize,
    max_k: usize,
}

/// Builds a [`Snapshot`] from raw records
pub struct BuildSnapshot;

impl BuildSnapshot {
    /// Aggregate events, build the interaction and similarity matrices and the
    /// popularity ranking. Pure function of its inputs.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or an unknown event kind under the `reject` policy.
    pub fn execute(
        events: &[Event],
        users: &[User],
        items: &[Item],
        config: &EngineConfig,
    ) -> Result<Snapshot> {
        config.validate()?;
        let started = Instant::now();

        let aggregation = InteractionAggregator::new(&config.weights, config.unknown_event_kind)
            .aggregate(events, items)?;

        let interactions = InteractionMatrix::build(&aggregation, users, items);
        let similarity = SimilarityMatrix::from_interactions(&interactions);
        let popularity =
            PopularityRanking::from_aggregation(&aggregation, interactions.items(), config.popularity);

        let stats = SnapshotStats {
            users: interactions.num_users(),
            items: interactions.num_items(),
            interactions: interactions.values().iter().filter(|v| **v > 0.0).count(),
        };

        info!(
            users = stats.users,
            items = stats.items,
            interactions = stats.interactions,
            events = aggregation.diagnostics.events_total,
            skipped = aggregation.diagnostics.skipped_events(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Snapshot built"
        );

        Ok(Snapshot {
            catalog: items
                .iter()
                .map(|item| (item.item_id.clone(), item.clone()))
                .collect(),
            activity: Self::group_activity(events),
            interactions,
            similarity,
            popularity,
            diagnostics: aggregation.diagnostics,
            stats,
            default_k: config.default_k,
            max_k: config.max_k,
        })
    }
}

impl BuildSnapshot {
    fn group_activity(events: &[Event]) -> HashMap<UserId, Vec<WatchEvent>> {
        let mut activity: HashMap<UserId, Vec<WatchEvent>> = HashMap::new();
        for event in events {
            if event.user_id.as_str().trim().is_empty() {
                continue;
            }
            activity
                .entry(event.user_id.clone())
                .or_default()
                .push(WatchEvent {
                    item_id: event.item_id.clone(),
                    event_type: event.event_type.clone(),
                    watch_seconds: event.watch_seconds,
                    timestamp: event.timestamp,
                });
        }
        for events in activity.values_mut() {
            events.sort_by(WatchEvent::display_order);
        }
        activity
    }
}

impl Snapshot {
    /// Top-`k` recommendations for `user_id` over all content types
    pub fn recommend(&self, user_id: &str, k: usize) -> Result<RecommendationList> {
        GenerateRecommendations::execute(self, user_id, &RecommendOptions::top(k))
    }

    pub fn recommend_with(
        &self,
        user_id: &str,
        options: &RecommendOptions,
    ) -> Result<RecommendationList> {
        GenerateRecommendations::execute(self, user_id, options)
    }

    /// Globally popular items, optionally restricted to one content type
    pub fn popular(&self, k: usize, content_type: Option<&str>) -> Result<Vec<PopularItem>> {
        RankPopularItems::execute(self, k, content_type)
    }

    /// History item responsible for the largest share of `item_id`'s score
    pub fn explain(&self, user_id: &str, item_id: &str) -> Result<Option<Attribution>> {
        ExplainRecommendation::execute(self, user_id, item_id)
    }

    /// Every history item's contribution to `item_id`'s score
    pub fn score_breakdown(&self, user_id: &str, item_id: &str) -> Result<ScoreBreakdown> {
        ExplainRecommendation::breakdown(self, user_id, item_id)
    }

    /// The user's positively scored items, highest first
    pub fn user_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let user_idx = self.user_index(user_id)?;

        Ok(self
            .interactions
            .user_history(user_idx)
            .into_iter()
            .take(limit)
            .filter_map(|(item_idx, score)| {
                self.item_id(item_idx).map(|item_id| HistoryEntry {
                    item_id: item_id.clone(),
                    score,
                })
            })
            .collect())
    }

    /// Items most similar to `item_id` ("viewers also watched")
    pub fn similar_items(&self, item_id: &str, n: usize) -> Result<Vec<(ItemId, f64)>> {
        let item_idx = self.item_index(item_id)?;

        Ok(self
            .similarity
            .most_similar(item_idx, n)
            .into_iter()
            .filter_map(|(idx, similarity)| self.item_id(idx).map(|id| (id.clone(), similarity)))
            .collect())
    }

    /// Catalog metadata; `None` for items only known from events
    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.catalog.get(item_id)
    }

    /// The user's raw events, longest watch first, at most `limit` of them
    pub fn user_activity(&self, user_id: &str, limit: usize) -> Result<UserActivity> {
        self.user_index(user_id)?;
        let events = self.activity.get(user_id).map(Vec::as_slice).unwrap_or(&[]);

        Ok(UserActivity {
            user_id: UserId::from(user_id),
            total_events: events.len(),
            events: events.iter().take(limit).cloned().collect(),
        })
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.interactions.users().contains(user_id)
    }

    pub fn interactions(&self) -> &InteractionMatrix {
        &self.interactions
    }

    pub fn similarity(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    pub fn popularity(&self) -> &PopularityRanking {
        &self.popularity
    }

    pub fn diagnostics(&self) -> &BuildDiagnostics {
        &self.diagnostics
    }

    pub fn stats(&self) -> SnapshotStats {
        self.stats
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn max_k(&self) -> usize {
        self.max_k
    }

    pub(crate) fn user_index(&self, user_id: &str) -> Result<usize> {
        self.interactions
            .users()
            .index_of(user_id)
            .ok_or_else(|| EngineError::UnknownUser(UserId::from(user_id)))
    }

    pub(crate) fn item_index(&self, item_id: &str) -> Result<usize> {
        self.interactions
            .items()
            .index_of(item_id)
            .ok_or_else(|| EngineError::UnknownItem(ItemId::from(item_id)))
    }

    pub(crate) fn item_id(&self, item_idx: usize) -> Option<&ItemId> {
        self.interactions.items().id_at(item_idx)
    }

    /// Whether the item passes an optional content type filter. Items without
    /// catalog metadata never match an explicit filter.
    pub(crate) fn matches_content_type(&self, item_idx: usize, content_type: Option<&str>) -> bool {
        match content_type {
            None => true,
            Some(wanted) => self
                .item_id(item_idx)
                .and_then(|id| self.catalog.get(id))
                .map(|item| item.is_content_type(wanted))
                .unwrap_or(false),
        }
    }

    /// Resolve a requested `k` against the configured default and maximum
    pub(crate) fn resolve_limit(&self, k: Option<usize>) -> Result<usize> {
        let k = k.unwrap_or(self.default_k);
        if k == 0 || k > self.max_k {
            return Err(EngineError::InvalidLimit { k, max: self.max_k });
        }
        Ok(k)
    }
}
