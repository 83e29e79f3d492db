//! Error types for the power position extract.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the power position extract.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream data violated its contract (e.g. period index out of range).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// The report file could not be written.
    #[error("Failed to write report {}: {source}", path.display())]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data integrity error.
    pub fn data_integrity(msg: impl Into<String>) -> Self {
        Error::DataIntegrity(msg.into())
    }

    /// Create a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }
}

/// Marker returned when an operation was abandoned because shutdown was requested.
///
/// Kept apart from [`Error`]: cancellation ends the run, it does not fail a tick.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;
