//! Error types for the call-screen library.
//!
//! The decision path itself never fails: unparseable numbers and unavailable
//! repositories fall back to "allow". These errors surface only from rule entry,
//! storage and host plumbing.

use thiserror::Error;

/// Errors that can occur in the call-screen library.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A phone number supplied for a block rule could not be normalized
    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    /// A prefix rule could not be built from the supplied digits or country code
    #[error("Invalid prefix rule: {0}")]
    InvalidPrefix(String),

    /// Region code is not an ISO 3166-1 alpha-2 code known to the numbering plan
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Requested rule does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A blocking storage task was cancelled or panicked
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with ScreenError
pub type Result<T> = std::result::Result<T, ScreenError>;

impl From<anyhow::Error> for ScreenError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
