//! Budget accounting checked before every outer-loop iteration.
//!
//! Iteration exhaustion is not a budget: it completes the session. Compute
//! time and memory trip `BudgetExceeded` with the budget named.

use std::sync::atomic::{AtomicU64, Ordering};

use telos_types::{BudgetKind, EvolutionSession};

/// Share of the memory ceiling at which the population is halved.
pub const MEMORY_PRESSURE_RATIO: f64 = 0.9;

// ── Memory Probe ────────────────────────────────────────────────────────

/// Measures how much memory a session occupies.
pub trait MemoryProbe: Send + Sync {
    fn measure(&self, session: &EvolutionSession) -> u64;
}

/// Estimates usage as the size of the serialized session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerializedSizeProbe;

impl MemoryProbe for SerializedSizeProbe {
    fn measure(&self, session: &EvolutionSession) -> u64 {
        session
            .to_bytes()
            .map(|bytes| bytes.len() as u64)
            .unwrap_or_default()
    }
}

/// Reports whatever value was last set. Handy for driving memory pressure
/// in tests.
#[derive(Debug, Default)]
pub struct FixedMemoryProbe {
    bytes: AtomicU64,
}

impl FixedMemoryProbe {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
        }
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::SeqCst);
    }
}

impl MemoryProbe for FixedMemoryProbe {
    fn measure(&self, _session: &EvolutionSession) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}

// ── Checks ──────────────────────────────────────────────────────────────

/// What the memory check asks the session manager to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryVerdict {
    WithinBudget,
    /// Usage crossed the pressure line for the first time: halve the
    /// population.
    Reduce { from: usize, to: usize },
    /// Still at or above the pressure line after the single reduction but
    /// under the ceiling.
    Pressure,
    Exceeded,
}

/// Compute-time budget check.
pub fn compute_exceeded(session: &EvolutionSession) -> bool {
    session
        .config
        .max_compute_time_ms
        .is_some_and(|limit| session.metrics.compute_time_ms >= limit)
}

/// Memory budget check for a measured usage.
pub fn assess_memory(session: &EvolutionSession, used: u64) -> MemoryVerdict {
    let Some(ceiling) = session.config.max_memory_bytes else {
        return MemoryVerdict::WithinBudget;
    };
    if (used as f64) < ceiling as f64 * MEMORY_PRESSURE_RATIO {
        return MemoryVerdict::WithinBudget;
    }
    if !session.memory_reduced {
        let from = session.effective_population_size;
        return MemoryVerdict::Reduce {
            from,
            to: (from / 2).max(1),
        };
    }
    if used > ceiling {
        MemoryVerdict::Exceeded
    } else {
        MemoryVerdict::Pressure
    }
}

/// First budget already exhausted, if any, given this check's memory
/// verdict.
pub fn exceeded_budget(session: &EvolutionSession, memory: MemoryVerdict) -> Option<BudgetKind> {
    if compute_exceeded(session) {
        return Some(BudgetKind::ComputeTime);
    }
    (memory == MemoryVerdict::Exceeded).then_some(BudgetKind::Memory)
}

pub fn iterations_exhausted(session: &EvolutionSession) -> bool {
    session.metrics.iterations_run >= u64::from(session.config.max_iterations)
}
