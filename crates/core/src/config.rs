//! Shared configuration loader module for Streamrec services
//!
//! This module provides a unified configuration loading system with environment variable
//! parsing, validation, and support for .env files. All configuration uses the
//! `STREAMREC_` prefix for environment variables.
//!
//! # Features
//!
//! - Environment variable parsing with typed values
//! - .env file support via dotenvy
//! - Configuration validation with clear error messages
//! - Default values for optional fields
//! - Configuration override hierarchy: defaults < .env < environment
//!
//! # Example
//!
//! ```no_run
//! use streamrec_core::config::{ConfigLoader, DatasetConfig, ServiceConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load .env file (optional)
//! streamrec_core::config::load_dotenv();
//!
//! let service_config = ServiceConfig::from_env()?;
//! let dataset_config = DatasetConfig::from_env()?;
//!
//! service_config.validate()?;
//! dataset_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::StreamrecError;
use crate::observability::LogFormat;
use std::path::PathBuf;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables
    ///
    /// Reads environment variables with the `STREAMREC_` prefix and constructs
    /// a configuration instance with defaults for missing optional values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if an environment variable value cannot be parsed.
    fn from_env() -> Result<Self, StreamrecError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if any validation check fails.
    fn validate(&self) -> Result<(), StreamrecError>;
}

/// Service configuration
///
/// # Environment Variables
///
/// - `STREAMREC_SERVICE_HOST` (optional): Service bind host (default: "127.0.0.1")
/// - `STREAMREC_SERVICE_PORT` (optional): Service bind port (default: 8001)
/// - `STREAMREC_SERVICE_WORKERS` (optional): Number of worker threads (default: CPU count)
/// - `STREAMREC_SERVICE_LOG_LEVEL` (optional): Log level (default: "info")
/// - `STREAMREC_SERVICE_LOG_FORMAT` (optional): `json` or `pretty` (default: "json")
///
/// # Example
///
/// ```bash
/// export STREAMREC_SERVICE_HOST="0.0.0.0"
/// export STREAMREC_SERVICE_PORT="3000"
/// export STREAMREC_SERVICE_LOG_LEVEL="debug"
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service bind host
    pub host: String,
    /// Service bind port
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    /// Socket address string for `HttpServer::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ConfigLoader for ServiceConfig {
    fn from_env() -> Result<Self, StreamrecError> {
        let defaults = ServiceConfig::default();

        let host = std::env::var("STREAMREC_SERVICE_HOST")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or(defaults.host);

        let port = parse_env_var("STREAMREC_SERVICE_PORT", defaults.port)?;
        let workers = parse_env_var("STREAMREC_SERVICE_WORKERS", defaults.workers)?;

        let log_level =
            std::env::var("STREAMREC_SERVICE_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_format = parse_env_var("STREAMREC_SERVICE_LOG_FORMAT", defaults.log_format)?;

        Ok(Self {
            host,
            port,
            workers,
            log_level,
            log_format,
        })
    }

    fn validate(&self) -> Result<(), StreamrecError> {
        if self.port == 0 {
            return Err(StreamrecError::configuration(
                "port must be greater than 0",
                "STREAMREC_SERVICE_PORT",
            ));
        }

        if self.workers == 0 {
            return Err(StreamrecError::configuration(
                "workers must be greater than 0",
                "STREAMREC_SERVICE_WORKERS",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(StreamrecError::configuration(
                format!(
                    "Invalid log_level '{}'. Must be one of: {}",
                    self.log_level,
                    valid_log_levels.join(", ")
                ),
                "STREAMREC_SERVICE_LOG_LEVEL",
            ));
        }

        Ok(())
    }
}

/// Location of the raw CSV exports the engine is built from
///
/// # Environment Variables
///
/// - `STREAMREC_DATA_DIR` (optional): Directory holding the CSV files (default: ".")
/// - `STREAMREC_USERS_FILE` (optional): Users file name (default: "users.csv")
/// - `STREAMREC_ITEMS_FILE` (optional): Items file name (default: "items.csv")
/// - `STREAMREC_EVENTS_FILE` (optional): Events file name (default: "events.csv")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub users_file: String,
    pub items_file: String,
    pub events_file: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            users_file: "users.csv".to_string(),
            items_file: "items.csv".to_string(),
            events_file: "events.csv".to_string(),
        }
    }
}

impl DatasetConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(&self.users_file)
    }

    pub fn items_path(&self) -> PathBuf {
        self.data_dir.join(&self.items_file)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(&self.events_file)
    }
}

impl ConfigLoader for DatasetConfig {
    fn from_env() -> Result<Self, StreamrecError> {
        let defaults = DatasetConfig::default();

        Ok(Self {
            data_dir: std::env::var("STREAMREC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            users_file: std::env::var("STREAMREC_USERS_FILE").unwrap_or(defaults.users_file),
            items_file: std::env::var("STREAMREC_ITEMS_FILE").unwrap_or(defaults.items_file),
            events_file: std::env::var("STREAMREC_EVENTS_FILE").unwrap_or(defaults.events_file),
        })
    }

    fn validate(&self) -> Result<(), StreamrecError> {
        for (name, key) in [
            (&self.users_file, "STREAMREC_USERS_FILE"),
            (&self.items_file, "STREAMREC_ITEMS_FILE"),
            (&self.events_file, "STREAMREC_EVENTS_FILE"),
        ] {
            if name.trim().is_empty() {
                return Err(StreamrecError::configuration(
                    "file name must not be empty",
                    key,
                ));
            }
        }

        if !self.data_dir.is_dir() {
            return Err(StreamrecError::configuration(
                format!("data_dir '{}' is not a directory", self.data_dir.display()),
                "STREAMREC_DATA_DIR",
            ));
        }

        Ok(())
    }
}

/// Helper function to parse environment variable with default value
///
/// # Errors
///
/// Returns a `ConfigurationError` if the value cannot be parsed
fn parse_env_var<T>(key: &str, default: T) -> Result<T, StreamrecError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                StreamrecError::configuration(format!("Failed to parse {}: {}", key, e), key)
            })
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// Does not return an error if the .env file is not found. Runs before logging
/// is initialized, so failures go to stderr.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
