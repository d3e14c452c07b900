//! Error types for curriculum generation and ordering.

use telos_types::TaskId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurriculumError {
    /// Predecessor links form a cycle among these tasks.
    #[error("task dependency cycle among {} task(s): {}", .0.len(), join(.0))]
    Cycle(Vec<TaskId>),

    #[error("task {task} depends on unknown task {predecessor}")]
    UnknownPredecessor { task: TaskId, predecessor: TaskId },

    /// A task must come after a harder predecessor.
    #[error("task {task} (difficulty {difficulty}) cannot follow difficulty {previous}")]
    NonMonotonic {
        task: TaskId,
        difficulty: f64,
        previous: f64,
    },

    #[error("task {task} runs before its predecessor {predecessor}")]
    PredecessorOutOfOrder { task: TaskId, predecessor: TaskId },

    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("invalid curriculum: {0}")]
    Invalid(String),
}

fn join(ids: &[TaskId]) -> String {
    ids.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
}

/// Result type for curriculum operations.
pub type CurriculumResult<T> = Result<T, CurriculumError>;
