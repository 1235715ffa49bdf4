//! Error types for biodesk.

use thiserror::Error;

/// Result type alias using biodesk's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for biodesk operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed required field, or wrong attachment count
    #[error("{0}")]
    Validation(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Authentication failed
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (admin gate)
    #[error("{0}")]
    Forbidden(String),

    /// Unique constraint or similar conflict
    #[error("{0}")]
    Conflict(String),

    /// Record store operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Extraction service call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of an external collaborator (record store, blob
    /// store, extraction API). These surface to callers as 5xx.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Storage(_) | Error::Inference(_) | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Inference(e.to_string())
    }
}
