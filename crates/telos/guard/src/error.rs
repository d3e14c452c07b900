//! Error types for the alignment guard.

use telos_types::PatternId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    /// Pattern score outside [0, 1].
    #[error("pattern {id} has success score {score} outside [0, 1]")]
    InvalidScore { id: PatternId, score: f64 },

    #[error("pattern not found: {0}")]
    PatternNotFound(PatternId),

    /// The shared pattern book lock was poisoned by a panicking writer.
    #[error("pattern book lock poisoned")]
    LockPoisoned,
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;
