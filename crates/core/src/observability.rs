//! Structured logging initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! JSON or a human-readable `fmt` layer. `RUST_LOG` takes precedence over the
//! configured level when it is set.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging initialization errors
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log shipping
    Json,
    /// Multi-line human readable output for local development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
    /// Include the event target (module path) in output
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
            ..Default::default()
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, ObservabilityError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|_| ObservabilityError::InvalidFilter(self.level.clone())),
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Must be called once at application startup.
///
/// # Errors
///
/// Returns error if the filter directive is invalid or a global subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), ObservabilityError> {
    let registry = tracing_subscriber::registry().with(config.env_filter()?);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    result.map_err(|e| ObservabilityError::SubscriberInit(e.to_string()))?;

    tracing::debug!(level = %config.level, format = %config.format, "Logging initialized");
    Ok(())
}
