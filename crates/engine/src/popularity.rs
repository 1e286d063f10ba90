//! Popularity Fallback
//!
//! Global, non-personalized item ranking computed from the same aggregated
//! interactions as the personalized scores. Serves unknown users, users with
//! empty history, and padding for short personalized lists.

use serde::{Deserialize, Serialize};
use streamrec_core::math::stable_sum;

use crate::aggregator::Aggregation;
use crate::error::{EngineError, Result};
use crate::matrix::IdIndex;
use crate::types::ItemId;

/// Weights of the blended popularity score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Weight of the max-normalised total interaction score (default: 0.5)
    pub score: f64,
    /// Weight of the max-normalised distinct user count (default: 0.3)
    pub users: f64,
    /// Weight of the max-normalised event count (default: 0.2)
    pub events: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            score: 0.5,
            users: 0.3,
            events: 0.2,
        }
    }
}

/// How interaction scores collapse across users into one number per item
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "reducer", rename_all = "snake_case")]
pub enum PopularityReducer {
    /// Sum of interaction scores over all users
    #[default]
    TotalScore,
    /// Weighted blend of total score, distinct users and event count, each
    /// divided by its maximum over the ranked items (the whole catalog, or the
    /// items passing a filter)
    Blended(BlendWeights),
}

impl PopularityReducer {
    pub fn validate(&self) -> Result<()> {
        if let PopularityReducer::Blended(weights) = self {
            let parts = [weights.score, weights.users, weights.events];
            if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(EngineError::Configuration(
                    "popularity blend weights must be non-negative".to_string(),
                ));
            }
            if parts.iter().all(|w| *w == 0.0) {
                return Err(EngineError::Configuration(
                    "at least one popularity blend weight must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Per-item totals feeding the reducer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ItemTotals {
    score: f64,
    users: usize,
    events: usize,
}

/// Items ranked by aggregate popularity
#[derive(Debug, Clone, PartialEq)]
pub struct PopularityRanking {
    /// `(item_idx, aggregate)` highest first, ties by item id
    ranked: Vec<(usize, f64)>,
    /// Aggregate by item index
    scores: Vec<f64>,
    totals: Vec<ItemTotals>,
    reducer: PopularityReducer,
}

impl PopularityRanking {
    /// Rank every item of `items`, including those without interactions
    pub fn from_aggregation(
        aggregation: &Aggregation,
        items: &IdIndex<ItemId>,
        reducer: PopularityReducer,
    ) -> Self {
        let mut contributions: Vec<Vec<f64>> = vec![Vec::new(); items.len()];
        let mut totals = vec![ItemTotals::default(); items.len()];

        for ((_, item_id), pair) in &aggregation.scores {
            if let Some(idx) = items.index_of(item_id) {
                contributions[idx].push(pair.score);
                totals[idx].users += 1;
                totals[idx].events += pair.events;
            }
        }
        for (idx, values) in contributions.into_iter().enumerate() {
            totals[idx].score = stable_sum(values);
        }

        let ranked = Self::reduce(&totals, (0..totals.len()).collect(), reducer);
        let mut scores = vec![0.0; totals.len()];
        for &(idx, score) in &ranked {
            scores[idx] = score;
        }

        Self {
            ranked,
            scores,
            totals,
            reducer,
        }
    }

    /// Rank only the items accepted by `eligible`
    ///
    /// `TotalScore` keeps the global aggregates. `Blended` renormalises
    /// against the maxima of the eligible items, so its scores can differ
    /// from [`PopularityRanking::score`].
    pub fn ranked_where(&self, eligible: impl Fn(usize) -> bool) -> Vec<(usize, f64)> {
        match self.reducer {
            PopularityReducer::TotalScore => self
                .ranked
                .iter()
                .copied()
                .filter(|&(idx, _)| eligible(idx))
                .collect(),
            PopularityReducer::Blended(_) => {
                let members = (0..self.totals.len()).filter(|&idx| eligible(idx)).collect();
                Self::reduce(&self.totals, members, self.reducer)
            }
        }
    }

    /// Reduce `members` to `(item_idx, aggregate)`, highest first, ties by index
    fn reduce(
        totals: &[ItemTotals],
        members: Vec<usize>,
        reducer: PopularityReducer,
    ) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = match reducer {
            PopularityReducer::TotalScore => members
                .into_iter()
                .map(|idx| (idx, totals[idx].score))
                .collect(),
            PopularityReducer::Blended(weights) => Self::blend(totals, &members, weights),
        };
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    fn blend(totals: &[ItemTotals], members: &[usize], weights: BlendWeights) -> Vec<(usize, f64)> {
        let member_totals = || members.iter().map(|&idx| totals[idx]);
        let max_score = member_totals().map(|t| t.score).fold(0.0, f64::max);
        let max_users = member_totals().map(|t| t.users).max().unwrap_or(0) as f64;
        let max_events = member_totals().map(|t| t.events).max().unwrap_or(0) as f64;

        let ratio = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

        members
            .iter()
            .map(|&idx| {
                let t = totals[idx];
                let score = weights.score * ratio(t.score, max_score)
                    + weights.users * ratio(t.users as f64, max_users)
                    + weights.events * ratio(t.events as f64, max_events);
                (idx, score)
            })
            .collect()
    }

    /// Every item in rank order as `(item_idx, aggregate)`
    pub fn ranked(&self) -> &[(usize, f64)] {
        &self.ranked
    }

    /// The first `k` entries of the ranking
    pub fn top(&self, k: usize) -> &[(usize, f64)] {
        &self.ranked[..k.min(self.ranked.len())]
    }

    pub fn score(&self, item_idx: usize) -> f64 {
        self.scores.get(item_idx).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
