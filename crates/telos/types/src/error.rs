//! Error types for the data model and codec.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::ObjectiveId;

/// Line/column inside a rejected payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadPosition {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for PayloadPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// Errors raised by the genome model, its codec and the session record.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The payload declares a schema version this build does not understand.
    #[error(
        "unknown schema version {found} (supported {min_supported}..={max_supported})"
    )]
    UnknownSchemaVersion {
        found: u64,
        min_supported: u32,
        max_supported: u32,
    },

    /// The payload could not be parsed.
    #[error("malformed payload{}: {message}", describe_position(.position))]
    MalformedPayload {
        position: Option<PayloadPosition>,
        message: String,
    },

    /// A genome or session broke one of its structural invariants.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Referenced objective does not exist in the genome.
    #[error("objective not found: {0}")]
    ObjectiveNotFound(ObjectiveId),

    /// Encoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Session state machine refused a transition.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn describe_position(position: &Option<PayloadPosition>) -> String {
    match position {
        Some(p) => format!(" at {}", p),
        None => String::new(),
    }
}

impl ModelError {
    /// Hard failures that must surface to the caller instead of being absorbed.
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownSchemaVersion { .. }
                | Self::MalformedPayload { .. }
                | Self::InvariantViolation(_)
        )
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
