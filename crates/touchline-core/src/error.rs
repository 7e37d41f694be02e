//! Error types for touchline-core

use thiserror::Error;

/// Result type alias using touchline-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in touchline-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Sync API error (endpoint reachable but request rejected)
    #[error("Sync API error: {0}")]
    Api(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid sync configuration
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
}
