//! Interaction Aggregator
//!
//! Collapses raw events into one weighted interaction score per (user, item)
//! pair: `score = Σ watch_seconds × weight(event_type)`.
//!
//! Malformed events (negative or non-finite duration, empty ids) never abort
//! the aggregation; they are skipped and tallied in [`BuildDiagnostics`].
//! A skipped event still registers its non-empty ids, so a user whose events
//! were all skipped is known with an empty history.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use streamrec_core::math::stable_sum;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{Event, Item, ItemId, UserId};
use crate::weights::{EventWeightPolicy, UnknownEventKindPolicy, NEUTRAL_WEIGHT};

/// Aggregated interaction of one user with one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairScore {
    /// Weighted, summed watch duration
    pub score: f64,
    /// Number of accepted events behind `score`
    pub events: usize,
}

/// Tally of everything the build tolerated rather than failed on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDiagnostics {
    pub events_total: usize,
    pub events_accepted: usize,
    /// Negative/non-finite duration or empty id
    pub malformed_events: usize,
    /// Skipped events per unknown kind
    pub unknown_event_kinds: BTreeMap<String, usize>,
    /// Events scored with the neutral weight, per unknown kind
    pub neutral_weight_events: BTreeMap<String, usize>,
    /// Item ids referenced by events but missing from the catalog
    pub unknown_items: BTreeSet<ItemId>,
}

impl BuildDiagnostics {
    pub fn skipped_events(&self) -> usize {
        self.malformed_events + self.unknown_event_kinds.values().sum::<usize>()
    }

    pub fn has_issues(&self) -> bool {
        self.skipped_events() > 0
            || !self.neutral_weight_events.is_empty()
            || !self.unknown_items.is_empty()
    }
}

/// Output of [`InteractionAggregator::aggregate`]
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub scores: BTreeMap<(UserId, ItemId), PairScore>,
    /// Every non-empty user id seen in the event log, scored or not
    pub user_ids: BTreeSet<UserId>,
    /// Every non-empty item id seen in the event log, scored or not
    pub item_ids: BTreeSet<ItemId>,
    pub diagnostics: BuildDiagnostics,
}

impl Aggregation {
    /// Interaction score of a pair, 0.0 when the pair has no events
    pub fn score(&self, user_id: &UserId, item_id: &ItemId) -> f64 {
        self.scores
            .get(&(user_id.clone(), item_id.clone()))
            .map(|pair| pair.score)
            .unwrap_or(0.0)
    }

    pub fn users(&self) -> &BTreeSet<UserId> {
        &self.user_ids
    }

    pub fn items(&self) -> &BTreeSet<ItemId> {
        &self.item_ids
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Converts raw events into per-pair interaction scores
pub struct InteractionAggregator<'a> {
    weights: &'a EventWeightPolicy,
    unknown_kind: UnknownEventKindPolicy,
}

impl<'a> InteractionAggregator<'a> {
    pub fn new(weights: &'a EventWeightPolicy, unknown_kind: UnknownEventKindPolicy) -> Self {
        Self {
            weights,
            unknown_kind,
        }
    }

    /// Aggregate `events` against the item `catalog`
    ///
    /// Contributions of a pair are summed with [`stable_sum`], so the result
    /// is identical for any ordering of `events`.
    ///
    /// # Errors
    ///
    /// Only with [`UnknownEventKindPolicy::Reject`]: the first event kind
    /// missing from the weight table yields `InvalidWeight`.
    pub fn aggregate(&self, events: &[Event], catalog: &[Item]) -> Result<Aggregation> {
        let known_items: HashSet<&str> = catalog.iter().map(|i| i.item_id.as_str()).collect();
        let mut diagnostics = BuildDiagnostics {
            events_total: events.len(),
            ..Default::default()
        };
        let mut contributions: BTreeMap<(UserId, ItemId), Vec<f64>> = BTreeMap::new();
        let mut user_ids = BTreeSet::new();
        let mut item_ids = BTreeSet::new();

        for event in events {
            if !is_blank(event.user_id.as_str()) {
                user_ids.insert(event.user_id.clone());
            }
            if !is_blank(event.item_id.as_str()) {
                if !known_items.contains(event.item_id.as_str()) {
                    diagnostics.unknown_items.insert(event.item_id.clone());
                }
                item_ids.insert(event.item_id.clone());
            }

            if !Self::is_well_formed(event) {
                debug!(
                    user_id = %event.user_id,
                    item_id = %event.item_id,
                    watch_seconds = event.watch_seconds,
                    "Skipping malformed event"
                );
                diagnostics.malformed_events += 1;
                continue;
            }

            let Some(weight) = self.resolve_weight(&event.event_type, &mut diagnostics)? else {
                continue;
            };

            contributions
                .entry((event.user_id.clone(), event.item_id.clone()))
                .or_default()
                .push(event.watch_seconds * weight);
            diagnostics.events_accepted += 1;
        }

        let scores = contributions
            .into_iter()
            .map(|(key, values)| {
                let events = values.len();
                let score = stable_sum(values);
                (key, PairScore { score, events })
            })
            .collect();

        if diagnostics.skipped_events() > 0 {
            warn!(
                skipped = diagnostics.skipped_events(),
                malformed = diagnostics.malformed_events,
                unknown_kinds = ?diagnostics.unknown_event_kinds,
                "Events skipped during aggregation"
            );
        }
        if !diagnostics.unknown_items.is_empty() {
            warn!(
                count = diagnostics.unknown_items.len(),
                "Events reference items missing from the catalog"
            );
        }

        Ok(Aggregation {
            scores,
            user_ids,
            item_ids,
            diagnostics,
        })
    }

    fn is_well_formed(event: &Event) -> bool {
        !is_blank(event.user_id.as_str())
            && !is_blank(event.item_id.as_str())
            && event.watch_seconds.is_finite()
            && event.watch_seconds >= 0.0
    }

    fn resolve_weight(
        &self,
        kind: &str,
        diagnostics: &mut BuildDiagnostics,
    ) -> Result<Option<f64>> {
        match self.weights.weight(kind) {
            Ok(weight) => Ok(Some(weight)),
            Err(err) => match self.unknown_kind {
                UnknownEventKindPolicy::Reject => Err(err),
                UnknownEventKindPolicy::Skip => {
                    *diagnostics
                        .unknown_event_kinds
                        .entry(kind.to_string())
                        .or_insert(0) += 1;
                    Ok(None)
                }
                UnknownEventKindPolicy::Neutral => {
                    *diagnostics
                        .neutral_weight_events
                        .entry(kind.to_string())
                        .or_insert(0) += 1;
                    Ok(Some(NEUTRAL_WEIGHT))
                }
            },
        }
    }
}

fn is_blank(id: &str) -> bool {
    id.trim().is_empty()
}
