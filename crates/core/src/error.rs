//! Error types shared across Streamrec crates

use thiserror::Error;

/// Errors raised while loading or validating shared configuration
#[derive(Debug, Error)]
pub enum StreamrecError {
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        /// Environment variable or config key that caused the error
        key: Option<String>,
    },
}

impl StreamrecError {
    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = StreamrecError::configuration("port must be greater than 0", "STREAMREC_PORT");
        assert_eq!(
            err.to_string(),
            "Configuration error: port must be greater than 0"
        );
        let StreamrecError::ConfigurationError { key, .. } = err;
        assert_eq!(key.as_deref(), Some("STREAMREC_PORT"));
    }
}
