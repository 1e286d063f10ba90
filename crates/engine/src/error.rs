//! Engine error taxonomy

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::types::{ItemId, UserId};

/// Errors surfaced by snapshot construction and recommendation queries
#[derive(Debug, Error)]
pub enum EngineError {
    /// The user id appears in neither the event log nor the user records
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    /// The item id is not part of the snapshot
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    /// An event kind has no entry in the weight policy
    #[error("No weight configured for event kind '{kind}'")]
    InvalidWeight { kind: String },

    #[error("Invalid recommendation limit {k} (must be between 1 and {max})")]
    InvalidLimit { k: usize, max: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

impl From<streamrec_core::StreamrecError> for EngineError {
    fn from(err: streamrec_core::StreamrecError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

impl EngineError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnknownUser(_) => "unknown_user",
            EngineError::UnknownItem(_) => "unknown_item",
            EngineError::InvalidWeight { .. } => "invalid_weight",
            EngineError::InvalidLimit { .. } => "invalid_limit",
            EngineError::Configuration(_) => "configuration_error",
            EngineError::Dataset(_) | EngineError::Io(_) | EngineError::Csv(_) => "dataset_error",
        }
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::UnknownUser(_) | EngineError::UnknownItem(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidLimit { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.code(),
            "error_description": self.to_string()
        }))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
