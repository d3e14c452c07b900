//! Error types for the evolution loops and their collaborators.

use std::time::Duration;

use telos_curriculum::CurriculumError;
use telos_fitness::SelectionError;
use telos_mutation::MutationError;
use thiserror::Error;

/// Failures reported by an execution harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("task execution failed: {0}")]
    Failed(String),

    /// The harness answered with an outcome that breaks its contract.
    #[error("invalid task outcome: {0}")]
    InvalidOutcome(String),

    #[error("harness unavailable: {0}")]
    Unavailable(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

/// Failures of the optional critique step. All are recovered by falling
/// back to fitness scores alone.
#[derive(Debug, Error)]
pub enum CritiqueError {
    #[error("critique timed out after {0:?}")]
    Timeout(Duration),

    #[error("only {responded} reviewer(s) responded, need at least {required}")]
    InsufficientReviewers { responded: usize, required: usize },

    #[error("critique collaborator error: {0}")]
    Collaborator(String),
}

pub type CritiqueResult<T> = Result<T, CritiqueError>;

/// Failures that stop a generation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot evolve an empty population")]
    EmptyPopulation,

    #[error("mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("curriculum error: {0}")]
    Curriculum(#[from] CurriculumError),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn is_hard_failure(&self) -> bool {
        match self {
            Self::InvariantViolation(_) => true,
            Self::Mutation(e) => e.is_hard_failure(),
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
