//! Error types for the FxGate service.

use thiserror::Error;

/// Main error type for FxGate startup and serving.
#[derive(Error, Debug)]
pub enum FxGateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for FxGateError {
    fn from(err: config::ConfigError) -> Self {
        FxGateError::Config(err.to_string())
    }
}

/// Result type alias for FxGate operations.
pub type Result<T> = std::result::Result<T, FxGateError>;
