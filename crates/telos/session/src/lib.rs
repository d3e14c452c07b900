//! # telos-session
//!
//! Owns evolution sessions and drives their outer loop.
//!
//! ```text
//!              pause                 resume
//!   Running ─────────▶ Paused ─────────────▶ Running
//!     │                   │
//!     ├─ iterations done ─┼──▶ Completed
//!     ├─ budget spent ────┼──▶ BudgetExceeded { budget }
//!     └─ stop ────────────┴──▶ Stopped
//! ```
//!
//! Budgets are checked before an iteration starts, so a session overruns a
//! limit by at most one iteration. Memory pressure (90% of the ceiling)
//! halves the population once; staying over the ceiling afterwards ends
//! the session. Checkpoints flush buffered store writes and persist the
//! session snapshot.

#![deny(unsafe_code)]

pub mod budget;
pub mod error;
pub mod manager;
pub mod report;

pub use budget::{
    assess_memory, compute_exceeded, exceeded_budget, iterations_exhausted, FixedMemoryProbe,
    MemoryProbe, MemoryVerdict, SerializedSizeProbe, MEMORY_PRESSURE_RATIO,
};
pub use error::{SessionError, SessionResult};
pub use manager::{SessionManager, StopMode};
pub use report::{IterationReport, SessionReport};
