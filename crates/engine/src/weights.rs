//! Event weight policy
//!
//! Maps an event kind to the multiplier applied to its watch duration.
//! Defaults mirror the production weighting; every entry can be overridden
//! from configuration.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weight applied to unknown kinds under [`UnknownEventKindPolicy::Neutral`]
pub const NEUTRAL_WEIGHT: f64 = 1.0;

/// Default `(kind, weight)` table
pub const DEFAULT_EVENT_WEIGHTS: [(&str, f64); 6] = [
    ("play", 1.0),
    ("complete", 3.0),
    ("like", 2.5),
    ("save", 2.0),
    ("pause", 0.5),
    ("skip", 0.1),
];

/// How the aggregator treats an event kind missing from the weight table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownEventKindPolicy {
    /// Skip the event and count it in the build diagnostics
    Skip,
    /// Apply [`NEUTRAL_WEIGHT`] and count the substitution
    #[default]
    Neutral,
    /// Abort snapshot construction with [`EngineError::InvalidWeight`]
    Reject,
}

/// Named, overridable table of event kind -> positive multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventWeightPolicy {
    weights: BTreeMap<String, f64>,
}

impl Default for EventWeightPolicy {
    fn default() -> Self {
        Self {
            weights: DEFAULT_EVENT_WEIGHTS
                .iter()
                .map(|(kind, weight)| (kind.to_string(), *weight))
                .collect(),
        }
    }
}

impl EventWeightPolicy {
    /// Empty table; every kind is unknown until added
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Add or override the weight of `kind`
    pub fn with_weight(mut self, kind: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(kind.into(), weight);
        self
    }

    /// Weight for `kind`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWeight`] when `kind` has no entry.
    pub fn weight(&self, kind: &str) -> Result<f64> {
        self.weights
            .get(kind)
            .copied()
            .ok_or_else(|| EngineError::InvalidWeight {
                kind: kind.to_string(),
            })
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.weights.contains_key(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Every weight must be finite and strictly positive
    pub fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(EngineError::Configuration(
                "event weight table must not be empty".to_string(),
            ));
        }

        for (kind, weight) in &self.weights {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(EngineError::Configuration(format!(
                    "weight for event kind '{}' must be a positive number, got {}",
                    kind, weight
                )));
            }
        }

        Ok(())
    }
}
