//! # telos-mutation
//!
//! Operators that derive new candidate genomes from one or two parents.
//!
//! | Operator    | Parents | Effect                                          |
//! |-------------|---------|-------------------------------------------------|
//! | `Add`       | 1       | Append an objective (id must be new)            |
//! | `Remove`    | 1       | Drop an objective (never the last one)          |
//! | `Perturb`   | 1       | Shift parameters of one objective               |
//! | `Recombine` | 2       | Non-empty subset of both parents' objectives    |
//!
//! Every child has `generation = parent.generation + 1` and names its
//! (first) parent. A child that fails this contract is rejected with
//! [`MutationError::InvariantViolation`] and never returned.

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod operators;
pub mod types;

pub use engine::{MutationEngine, DEFAULT_PERTURB_PARAMETER};
pub use error::{MutationError, MutationResult};
pub use operators::{
    add_objective, perturb_objective, recombine, recombine_keeping, remove_objective,
    MUTATION_KEY, SECONDARY_PARENT_KEY,
};
pub use types::{Mutation, MutationType, MutationWeights};
