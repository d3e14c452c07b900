//! # telos-guard
//!
//! Hard-constraint filter over candidate genomes.
//!
//! A genome is rejected when any of its objectives opposes any active
//! pattern whose `success_score` exceeds 0.5. How an objective's stance is
//! decided is a pluggable [`ConflictComparator`]; the rejection policy is
//! fixed here.
//!
//! Patterns live in a shared [`PatternBook`]. The outer loop snapshots it
//! at the start of every iteration, so updates take effect on the next
//! iteration without restarting a session.

#![deny(unsafe_code)]

pub mod comparator;
pub mod error;
pub mod guard;
pub mod pattern;

pub use comparator::{ConflictComparator, RuleComparator, Stance};
pub use error::{GuardError, GuardResult};
pub use guard::{AlignmentGuard, FilterOutcome, GuardVerdict};
pub use pattern::{AlignmentPattern, PatternBook, HIGH_CONFIDENCE_THRESHOLD};
