//! Engine configuration
//!
//! Weight table, unknown event kind policy, popularity reducer and request
//! limits, layered from `config/engine.*` and `STREAMREC_ENGINE__*` variables.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::popularity::PopularityReducer;
use crate::weights::{EventWeightPolicy, UnknownEventKindPolicy};

/// Default number of recommendations per request
pub const DEFAULT_K: usize = 10;

/// Upper bound on `k` accepted by a single request
pub const MAX_K: usize = 50;

/// Engine configuration
///
/// Loaded from an optional `config/engine.{toml,yaml,json}` file layered under
/// `STREAMREC_ENGINE__*` environment variables. A configured `weights` table
/// replaces the default table rather than merging with it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Event kind -> duration multiplier
    pub weights: EventWeightPolicy,

    /// Handling of event kinds missing from `weights`
    pub unknown_event_kind: UnknownEventKindPolicy,

    /// Reducer used to rank items globally
    pub popularity: PopularityReducer,

    /// `k` used when a request does not specify one (default: 10)
    pub default_k: usize,

    /// Largest `k` a request may ask for (default: 50)
    pub max_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: EventWeightPolicy::default(),
            unknown_event_kind: UnknownEventKindPolicy::default(),
            popularity: PopularityReducer::default(),
            default_k: DEFAULT_K,
            max_k: MAX_K,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/engine").required(false))
            .add_source(
                config::Environment::with_prefix("STREAMREC_ENGINE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_weights(mut self, weights: EventWeightPolicy) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_unknown_event_kind(mut self, policy: UnknownEventKindPolicy) -> Self {
        self.unknown_event_kind = policy;
        self
    }

    pub fn with_popularity(mut self, reducer: PopularityReducer) -> Self {
        self.popularity = reducer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.popularity.validate()?;

        if self.default_k == 0 {
            return Err(EngineError::Configuration(
                "default_k must be greater than 0".to_string(),
            ));
        }

        if self.max_k < self.default_k {
            return Err(EngineError::Configuration(format!(
                "max_k ({}) cannot be smaller than default_k ({})",
                self.max_k, self.default_k
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::popularity::BlendWeights;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.default_k, 10);
        assert_eq!(config.max_k, 50);
        assert_eq!(config.unknown_event_kind, UnknownEventKindPolicy::Neutral);
        assert_eq!(config.popularity, PopularityReducer::TotalScore);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_default_k() {
        let mut config = EngineConfig::default();
        config.default_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_max_below_default() {
        let mut config = EngineConfig::default();
        config.max_k = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_weights() {
        let config = EngineConfig::default()
            .with_weights(EventWeightPolicy::default().with_weight("skip", -1.0));
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "unknown_event_kind": "skip",
                "popularity": {"reducer": "blended", "score": 0.5, "users": 0.3, "events": 0.2},
                "max_k": 20
            }"#,
        )
        .unwrap();

        assert_eq!(config.unknown_event_kind, UnknownEventKindPolicy::Skip);
        assert_eq!(config.popularity, PopularityReducer::Blended(BlendWeights::default()));
        assert_eq!(config.max_k, 20);
        assert_eq!(config.default_k, 10);
        assert_eq!(config.weights, EventWeightPolicy::default());
    }
}
