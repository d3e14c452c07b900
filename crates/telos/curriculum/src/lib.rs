//! # telos-curriculum
//!
//! Turns a genome's objectives into a task sequence for the execution
//! harness and applies the single-remedial policy while results come in.
//!
//! Ordering: predecessors first, difficulty non-decreasing. See
//! [`order_tasks`] and [`validate_order`].

#![deny(unsafe_code)]

pub mod error;
pub mod generator;
pub mod order;
pub mod run;

pub use error::{CurriculumError, CurriculumResult};
pub use generator::{CurriculumGenerator, LadderCurriculum};
pub use order::{order_tasks, validate_order};
pub use run::{CurriculumRun, RunEvent};
