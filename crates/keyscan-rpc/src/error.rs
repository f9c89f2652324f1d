//! Error types for the JSON-RPC client

use keyscan_core::TransportError;
use thiserror::Error;

/// Result type alias for configuration and client setup
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading configuration or building the client
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Classify a failed HTTP exchange
pub(crate) fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_decode() {
        TransportError::Malformed(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
