//! Error types for shelfscan-core

use thiserror::Error;

/// Main error type for the shelfscan-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (e.g. the database directory cannot be created)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error for structured columns
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for shelfscan-core
pub type Result<T> = std::result::Result<T, Error>;
