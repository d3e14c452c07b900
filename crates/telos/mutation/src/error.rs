//! Error types for mutation operators.

use telos_types::{GenomeId, ModelError, ObjectiveId};
use thiserror::Error;

/// Errors raised while deriving a child genome.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The new objective's id already exists in the genome.
    #[error("duplicate objective id: {0}")]
    DuplicateObjectiveId(ObjectiveId),

    /// Removing would leave the genome without objectives.
    #[error("cannot remove the last objective of genome {0}")]
    LastObjectiveViolation(GenomeId),

    #[error("objective not found: {0}")]
    ObjectiveNotFound(ObjectiveId),

    /// The delta left every parameter of the objective unchanged.
    #[error("perturbation of {0} changed no parameter")]
    NoEffectivePerturbation(ObjectiveId),

    /// The supplied objective (or a perturbed one) is malformed.
    #[error("invalid objective: {0}")]
    InvalidObjective(String),

    /// Recombination was requested without a second parent.
    #[error("recombination requires a partner genome distinct from {0}")]
    MissingPartner(GenomeId),

    /// A produced child broke the lineage or objective invariants.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl MutationError {
    /// Whether the error reflects a programming bug rather than bad input.
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

impl From<ModelError> for MutationError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ObjectiveNotFound(id) => Self::ObjectiveNotFound(id),
            other => Self::InvariantViolation(other.to_string()),
        }
    }
}

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;
