//! # telos-store
//!
//! Persistence boundary for genomes, session snapshots and the learning
//! log.
//!
//! - [`GenomeStore`]: the async collaborator interface.
//! - [`InMemoryGenomeStore`]: reference implementation, also used by tests.
//! - [`BufferedPersistence`]: wraps any store so that an unreachable store
//!   never blocks an evolution run.

#![deny(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use buffer::{BufferedPersistence, FlushReport, WriteOutcome};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryGenomeStore, UnavailableStore};
pub use model::{GenerationRecord, LearningEntry, ScoredGenome};
pub use traits::GenomeStore;
