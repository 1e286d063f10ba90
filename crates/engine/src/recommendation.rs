//! Recommendation Generator
//!
//! Item-based collaborative filtering over an immutable [`Snapshot`].
//!
//! Steps:
//! 1. Resolve the user's history S (items with a positive interaction score)
//! 2. Score every unseen candidate: `Σ_{s∈S} sim(c, s) × score(user, s)`
//! 3. Rank by score, ties by item id ascending
//! 4. Pad short lists from the popularity ranking
//!
//! Unknown users and users with an empty history are answered from the
//! popularity ranking with the list explicitly marked as a fallback.

use serde::Deserialize;
use streamrec_core::math::CompensatedSum;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::similarity::SimilarityMatrix;
use crate::snapshot::Snapshot;
use crate::types::{
    FallbackReason, PopularItem, Recommendation, RecommendationList, RecommendationMode,
    RecommendationOrigin, UserId,
};

/// Per-request recommendation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecommendOptions {
    /// Number of items to return; the configured default when unset
    pub k: Option<usize>,
    /// Restrict candidates and padding to one content type (case-insensitive)
    pub content_type: Option<String>,
}

impl RecommendOptions {
    pub fn top(k: usize) -> Self {
        Self {
            k: Some(k),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Score of one candidate and the history item behind most of it
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CandidateScore {
    pub score: f64,
    /// `(item_idx, contribution)` of the dominant history item
    pub source: Option<(usize, f64)>,
}

/// Score `candidate` against a user history of `(item_idx, score)` pairs
///
/// The dominant source is the argmax of `sim × score`; equal contributions
/// resolve to the smallest item index, i.e. the smallest item id.
pub(crate) fn score_candidate(
    similarity: &SimilarityMatrix,
    history: &[(usize, f64)],
    candidate: usize,
) -> CandidateScore {
    let mut total = CompensatedSum::default();
    let mut source: Option<(usize, f64)> = None;

    for &(item_idx, interaction) in history {
        let contribution = similarity.get(candidate, item_idx) * interaction;
        total.add(contribution);

        if contribution <= 0.0 {
            continue;
        }
        source = match source {
            Some((best_idx, best))
                if best > contribution || (best == contribution && best_idx < item_idx) =>
            {
                Some((best_idx, best))
            }
            _ => Some((item_idx, contribution)),
        };
    }

    CandidateScore {
        score: total.value(),
        source,
    }
}

/// Generate top-k recommendations for one user
pub struct GenerateRecommendations;

impl GenerateRecommendations {
    /// # Errors
    ///
    /// `InvalidLimit` when `k` is zero or above the configured maximum.
    /// Unknown users are not an error: they receive a marked fallback list.
    pub fn execute(
        snapshot: &Snapshot,
        user_id: &str,
        options: &RecommendOptions,
    ) -> Result<RecommendationList> {
        let k = snapshot.resolve_limit(options.k)?;
        let content_type = options.content_type.as_deref();

        let user_idx = match snapshot.user_index(user_id) {
            Ok(idx) => idx,
            Err(EngineError::UnknownUser(_)) => {
                debug!(user_id, "Unknown user, serving popularity fallback");
                return Ok(Self::fallback(
                    snapshot,
                    user_id,
                    k,
                    content_type,
                    FallbackReason::UnknownUser,
                ));
            }
            Err(err) => return Err(err),
        };

        let history = snapshot.interactions().user_history(user_idx);
        if history.is_empty() {
            debug!(user_id, "Empty history, serving popularity fallback");
            return Ok(Self::fallback(
                snapshot,
                user_id,
                k,
                content_type,
                FallbackReason::EmptyHistory,
            ));
        }

        let num_items = snapshot.interactions().num_items();
        let mut excluded = vec![false; num_items];
        for &(item_idx, _) in &history {
            excluded[item_idx] = true;
        }

        let mut candidates: Vec<(usize, CandidateScore)> = (0..num_items)
            .filter(|&idx| !excluded[idx] && snapshot.matches_content_type(idx, content_type))
            .map(|idx| (idx, score_candidate(snapshot.similarity(), &history, idx)))
            .filter(|(_, candidate)| candidate.score > 0.0)
            .collect();

        candidates.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
        candidates.truncate(k);

        let mut items = Vec::with_capacity(k);
        for (idx, candidate) in candidates {
            excluded[idx] = true;
            let Some(item_id) = snapshot.item_id(idx) else {
                continue;
            };
            items.push(Recommendation {
                item_id: item_id.clone(),
                score: candidate.score,
                source_item: candidate
                    .source
                    .and_then(|(source_idx, _)| snapshot.item_id(source_idx))
                    .cloned(),
                origin: RecommendationOrigin::Collaborative,
            });
        }

        let personalized = items.len();
        Self::pad_from_popularity(snapshot, &mut items, &mut excluded, k, content_type);

        debug!(
            user_id,
            k,
            history = history.len(),
            personalized,
            padded = items.len() - personalized,
            "Recommendations generated"
        );

        Ok(RecommendationList {
            user_id: UserId::from(user_id),
            mode: RecommendationMode::Personalized,
            items,
        })
    }

    fn fallback(
        snapshot: &Snapshot,
        user_id: &str,
        k: usize,
        content_type: Option<&str>,
        reason: FallbackReason,
    ) -> RecommendationList {
        let mut items = Vec::with_capacity(k);
        let mut excluded = vec![false; snapshot.interactions().num_items()];
        Self::pad_from_popularity(snapshot, &mut items, &mut excluded, k, content_type);

        RecommendationList {
            user_id: UserId::from(user_id),
            mode: RecommendationMode::Fallback(reason),
            items,
        }
    }

    /// Fill `items` up to `k` from the popularity ranking, skipping excluded items
    fn pad_from_popularity(
        snapshot: &Snapshot,
        items: &mut Vec<Recommendation>,
        excluded: &mut [bool],
        k: usize,
        content_type: Option<&str>,
    ) {
        for (idx, aggregate) in RankPopularItems::ranked(snapshot, content_type) {
            if items.len() >= k {
                break;
            }
            if excluded[idx] {
                continue;
            }
            let Some(item_id) = snapshot.item_id(idx) else {
                continue;
            };
            excluded[idx] = true;
            items.push(Recommendation {
                item_id: item_id.clone(),
                score: aggregate,
                source_item: None,
                origin: RecommendationOrigin::Popularity,
            });
        }
    }
}

/// Global popularity listing
pub struct RankPopularItems;

impl RankPopularItems {
    /// Top-`k` items by aggregate popularity, optionally of one content type
    pub fn execute(
        snapshot: &Snapshot,
        k: usize,
        content_type: Option<&str>,
    ) -> Result<Vec<PopularItem>> {
        let k = snapshot.resolve_limit(Some(k))?;

        Ok(Self::ranked(snapshot, content_type)
            .into_iter()
            .take(k)
            .filter_map(|(idx, score)| {
                snapshot.item_id(idx).map(|item_id| PopularItem {
                    item_id: item_id.clone(),
                    score,
                })
            })
            .collect())
    }

    /// Ranking restricted to `content_type`, renormalised by the reducer
    pub(crate) fn ranked(snapshot: &Snapshot, content_type: Option<&str>) -> Vec<(usize, f64)> {
        match content_type {
            None => snapshot.popularity().ranked().to_vec(),
            Some(_) => snapshot
                .popularity()
                .ranked_where(|idx| snapshot.matches_content_type(idx, content_type)),
        }
    }
}
