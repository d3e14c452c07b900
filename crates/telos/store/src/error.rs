use telos_types::{LineageError, ModelError};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (down, or the call timed out).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("lineage error: {0}")]
    Lineage(#[from] LineageError),

    /// A stored payload decoded but failed the genome contract.
    #[error("stored payload rejected: {0}")]
    Payload(#[from] ModelError),
}

impl StoreError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
