//! # Streamrec Core
//!
//! Shared building blocks for the Streamrec recommendation workspace.
//!
//! ## Modules
//!
//! - `error`: Error types shared by configuration and validation code
//! - `config`: Environment-driven configuration loading and validation
//! - `observability`: Structured logging initialization
//! - `math`: Vector utilities (dot product, cosine similarity, stable summation)

pub mod config;
pub mod error;
pub mod math;
pub mod observability;

// Re-export commonly used types
pub use config::{load_dotenv, ConfigLoader, DatasetConfig, ServiceConfig};
pub use error::StreamrecError;
pub use math::{
    cosine_similarity, dot_product, l2_norm, normalize_vector, stable_sum, CompensatedSum,
};
pub use observability::{init_logging, LogConfig, LogFormat, ObservabilityError};

/// Result type alias for Streamrec core operations
pub type Result<T> = std::result::Result<T, StreamrecError>;
