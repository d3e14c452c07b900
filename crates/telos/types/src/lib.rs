//! # telos-types
//!
//! Shared data model for the Telos goal-evolution engine.
//!
//! A [`GoalGenome`] is the unit of evolution: an ordered set of
//! objectives, the fitness criteria that measure them, and the lineage
//! that links it back to a seed. Genomes are immutable by convention;
//! every change produces a new genome with a fresh id.
//!
//! ```text
//!   seed (gen 0) ──▶ child (gen 1) ──▶ grandchild (gen 2)
//!        ▲                 │
//!        └── parent_id ────┘   (lineage is a forest, never a graph)
//! ```
//!
//! The crate also carries the records exchanged between components:
//! curriculum tasks and results, fitness scores, and the evolution
//! session with its state machine and budget configuration.

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod curriculum;
pub mod error;
pub mod genome;
pub mod ids;
pub mod lineage;
pub mod scoring;
pub mod session;

// ── Re-exports ──────────────────────────────────────────────────────

pub use codec::{
    deserialize, serialize, supported_schema_versions, CURRENT_SCHEMA_VERSION,
    MIN_SUPPORTED_SCHEMA_VERSION,
};
pub use config::SessionConfig;
pub use curriculum::{
    Curriculum, CurriculumTask, CurriculumTaskResult, InnerLoopResult, ObjectiveMeasurement,
};
pub use error::{ModelError, ModelResult, PayloadPosition};
pub use genome::{
    FitnessCriterion, GoalGenome, ObjectiveDescriptor, MEAN_SCORE_METRIC, PASS_RATE_METRIC,
};
pub use ids::{GenomeId, ObjectiveId, PatternId, SessionId, TaskId};
pub use lineage::{LineageError, LineageIndex};
pub use scoring::{FitnessScore, FitnessWeights, ObjectiveBreakdown};
pub use session::{BudgetKind, Conflict, EvolutionSession, SessionMetrics, SessionStatus};
