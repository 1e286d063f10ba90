//! On-demand attribution of recommendation scores
//!
//! Attribution is recomputed from the snapshot on every call, never stored.

use serde::Serialize;

use crate::error::Result;
use crate::recommendation::score_candidate;
use crate::snapshot::Snapshot;
use crate::types::{ItemId, UserId};

/// The history item responsible for the largest share of a candidate's score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub source_item: ItemId,
    /// `sim(item, source_item)`
    pub similarity: f64,
    /// `sim(item, source_item) × score(user, source_item)`
    pub contribution: f64,
    /// Full collaborative score of `item`
    pub total_score: f64,
}

/// One history item's share of a candidate score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub source_item: ItemId,
    pub similarity: f64,
    pub interaction_score: f64,
    pub contribution: f64,
}

/// Every history item's contribution to one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// The item is part of the user's own history and never recommended
    pub already_seen: bool,
    pub total_score: f64,
    /// Highest contribution first, ties by item id
    pub contributions: Vec<Contribution>,
}

pub struct ExplainRecommendation;

impl ExplainRecommendation {
    /// Attribute `item_id`'s score for `user_id`
    ///
    /// `Ok(None)` when the item is already in the user's history, the user
    /// has no history, or nothing in the history contributes to the item.
    ///
    /// # Errors
    ///
    /// `UnknownUser` / `UnknownItem` for ids not present in the snapshot.
    pub fn execute(snapshot: &Snapshot, user_id: &str, item_id: &str) -> Result<Option<Attribution>> {
        let user_idx = snapshot.user_index(user_id)?;
        let item_idx = snapshot.item_index(item_id)?;

        let history = snapshot.interactions().user_history(user_idx);
        if history.iter().any(|&(idx, _)| idx == item_idx) {
            return Ok(None);
        }

        let candidate = score_candidate(snapshot.similarity(), &history, item_idx);
        if candidate.score <= 0.0 {
            return Ok(None);
        }

        Ok(candidate.source.and_then(|(source_idx, contribution)| {
            snapshot.item_id(source_idx).map(|source_item| Attribution {
                user_id: UserId::from(user_id),
                item_id: ItemId::from(item_id),
                source_item: source_item.clone(),
                similarity: snapshot.similarity().get(item_idx, source_idx),
                contribution,
                total_score: candidate.score,
            })
        }))
    }

    /// Step-by-step view of how `item_id`'s score is assembled
    pub fn breakdown(snapshot: &Snapshot, user_id: &str, item_id: &str) -> Result<ScoreBreakdown> {
        let user_idx = snapshot.user_index(user_id)?;
        let item_idx = snapshot.item_index(item_id)?;

        let history = snapshot.interactions().user_history(user_idx);
        let already_seen = history.iter().any(|&(idx, _)| idx == item_idx);
        let candidate = score_candidate(snapshot.similarity(), &history, item_idx);

        let mut contributions: Vec<(usize, Contribution)> = history
            .iter()
            .filter(|&&(idx, _)| idx != item_idx)
            .filter_map(|&(idx, interaction_score)| {
                let similarity = snapshot.similarity().get(item_idx, idx);
                snapshot.item_id(idx).map(|source_item| {
                    (
                        idx,
                        Contribution {
                            source_item: source_item.clone(),
                            similarity,
                            interaction_score,
                            contribution: similarity * interaction_score,
                        },
                    )
                })
            })
            .collect();
        contributions.sort_by(|a, b| {
            b.1.contribution
                .total_cmp(&a.1.contribution)
                .then(a.0.cmp(&b.0))
        });

        Ok(ScoreBreakdown {
            user_id: UserId::from(user_id),
            item_id: ItemId::from(item_id),
            already_seen,
            total_score: if already_seen { 0.0 } else { candidate.score },
            contributions: if already_seen {
                Vec::new()
            } else {
                contributions.into_iter().map(|(_, c)| c).collect()
            },
        })
    }
}
