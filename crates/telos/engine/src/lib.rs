//! # telos-engine
//!
//! The two nested loops of goal evolution.
//!
//! - **Inner loop** ([`InnerLoop`]): generate a curriculum for one genome,
//!   run it through the [`ExecutionHarness`], remediate failures once, and
//!   report per-objective measurements.
//! - **Outer loop** ([`OuterLoop`]): mutate the population, drop candidates
//!   that conflict with alignment patterns, run inner loops concurrently,
//!   score, optionally consult a critique panel, and select survivors.
//!
//! Collaborators (harness, critique panel) are async traits with simulated
//! implementations for tests and demos.

#![deny(unsafe_code)]

pub mod critique;
pub mod error;
pub mod harness;
pub mod inner;
pub mod outer;

pub use critique::{
    run_critique, CritiqueCollaborator, CritiqueReport, CritiqueRequest, NoopCritique,
    ReviewerVerdict, ScriptedCritique, MIN_REVIEWERS,
};
pub use error::{
    CritiqueError, CritiqueResult, EngineError, EngineResult, HarnessError, HarnessResult,
};
pub use harness::{ExecutionHarness, FailingHarness, SimulatedHarness, TaskOutcome};
pub use inner::InnerLoop;
pub use outer::{CritiqueStatus, GenerationOutcome, GenerationParams, GenerationStats, OuterLoop};
