//! Unified error types for the crate.

use thiserror::Error;

/// Failure of the underlying document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite driver errors.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Document (de)serialization errors.
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("storage connection is poisoned")]
    Poisoned,

    /// A document with this id already exists.
    #[error("report {0} already exists")]
    Duplicate(String),
}

/// A report does not satisfy the model's field rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// JSON name of the offending field.
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            reason: "is required",
        }
    }
}
