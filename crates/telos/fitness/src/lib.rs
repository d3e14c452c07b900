//! # telos-fitness
//!
//! Ranks candidate genomes and picks the next generation.
//!
//! ```text
//!   aggregate = w_p * performance + w_n * novelty + w_t * taste_alignment
//! ```
//!
//! Performance is the weight-averaged per-objective pass rate from the
//! inner loop. Novelty is a pluggable [`NoveltyMetric`]. Taste alignment is
//! the guard's soft affinity among genomes that already passed the hard
//! filter. Selection is best-of-k tournament over the scored pool.

#![deny(unsafe_code)]

pub mod error;
pub mod evaluator;
pub mod novelty;
pub mod selection;

pub use error::{SelectionError, SelectionResult};
pub use evaluator::FitnessEvaluator;
pub use novelty::{NoveltyMetric, ObjectiveSpaceNovelty};
pub use selection::{Selection, TournamentSelector};
