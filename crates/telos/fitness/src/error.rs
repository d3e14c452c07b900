//! Error types for selection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectionError {
    /// No scored candidates to select from.
    #[error("cannot select from an empty candidate pool")]
    EmptyPool,

    #[error("tournament size must be at least 1")]
    InvalidTournamentSize,
}

/// Result type for selection.
pub type SelectionResult<T> = Result<T, SelectionError>;
