//! Evolution session record and its lifecycle state machine.
//!
//! ```text
//!              pause
//!   Running ─────────▶ Paused
//!     │ ▲ ◀───────────── │
//!     │     resume       │
//!     ├──▶ Completed     │
//!     ├──▶ BudgetExceeded│
//!     └──▶ Stopped ◀─────┘
//! ```
//!
//! `Completed`, `Stopped` and `BudgetExceeded` are terminal.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::{ModelError, ModelResult};
use crate::genome::GoalGenome;
use crate::ids::{GenomeId, ObjectiveId, PatternId, SessionId};
use crate::scoring::FitnessScore;

/// Most recent guard conflicts retained in session metrics.
pub const MAX_CONFLICT_LOG: usize = 256;

/// Which budget stopped a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    ComputeTime,
    Memory,
}

impl std::fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComputeTime => write!(f, "compute_time"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Stopped,
    BudgetExceeded { budget: BudgetKind },
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Stopped | Self::BudgetExceeded { .. }
        )
    }

    pub fn can_transition_to(&self, next: &SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Running, Paused)
                | (Paused, Running)
                | (Running, Completed)
                | (Running, BudgetExceeded { .. })
                | (Running, Stopped)
                | (Paused, Stopped)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Stopped => write!(f, "stopped"),
            Self::BudgetExceeded { budget } => write!(f, "budget_exceeded({budget})"),
        }
    }
}

/// A candidate objective that opposed a high-confidence pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub genome_id: GenomeId,
    pub objective_id: ObjectiveId,
    pub pattern_id: PatternId,
    pub reason: String,
}

/// Counters accumulated over a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub iterations_run: u64,
    pub candidates_generated: u64,
    pub candidates_rejected: u64,
    pub weak_generations: u64,
    pub harness_failures: u64,
    pub partial_cycles: u64,
    pub critique_fallbacks: u64,
    pub critique_exclusions: u64,
    pub store_failures: u64,
    pub dropped_genomes: u64,
    /// Store-sourced genomes refused at start for failing validation.
    #[serde(default)]
    pub rejected_store_genomes: u64,
    pub learning_entries: u64,
    pub compute_time_ms: u64,
    pub peak_memory_bytes: u64,
    /// Bounded to [`MAX_CONFLICT_LOG`], oldest first.
    #[serde(default)]
    pub conflicts: VecDeque<Conflict>,
}

impl SessionMetrics {
    pub fn record_conflict(&mut self, conflict: Conflict) {
        if self.conflicts.len() == MAX_CONFLICT_LOG {
            self.conflicts.pop_front();
        }
        self.conflicts.push_back(conflict);
    }

    pub fn observe_memory(&mut self, bytes: u64) {
        self.peak_memory_bytes = self.peak_memory_bytes.max(bytes);
    }
}

/// Evolutionary state that must survive pause/resume unchanged.
#[derive(Serialize)]
struct EvolutionState<'a> {
    current_generation: u32,
    population: &'a [GoalGenome],
    fitness_history: &'a [Vec<f64>],
}

/// One evolution run for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSession {
    pub id: SessionId,
    pub agent_name: String,
    pub status: SessionStatus,
    pub config: SessionConfig,
    /// Completed outer-loop iterations.
    pub current_generation: u32,
    pub population: Vec<GoalGenome>,
    /// Scores of the current population, aligned by genome id.
    #[serde(default)]
    pub population_scores: Vec<FitnessScore>,
    pub best_genome: Option<GoalGenome>,
    pub best_score: Option<f64>,
    /// One aggregate-score list per generation; append-only.
    pub fitness_history: Vec<Vec<f64>>,
    /// Population size in force; halved once under memory pressure.
    pub effective_population_size: usize,
    pub mutation_rate: f64,
    #[serde(default)]
    pub memory_reduced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_checkpoint_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub metrics: SessionMetrics,
}

impl EvolutionSession {
    pub fn new(agent_name: impl Into<String>, config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            agent_name: agent_name.into(),
            status: SessionStatus::Running,
            effective_population_size: config.population_size,
            mutation_rate: config.initial_mutation_rate,
            config,
            current_generation: 0,
            population: Vec::new(),
            population_scores: Vec::new(),
            best_genome: None,
            best_score: None,
            fitness_history: Vec::new(),
            memory_reduced: false,
            created_at: now,
            updated_at: now,
            last_checkpoint_at: None,
            finished_at: None,
            metrics: SessionMetrics::default(),
        }
    }

    /// Apply a state-machine transition.
    pub fn transition(&mut self, next: SessionStatus) -> ModelResult<()> {
        if !self.status.can_transition_to(&next) {
            return Err(ModelError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.touch();
        if next.is_terminal() {
            self.finished_at = Some(self.updated_at);
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Generation, population and fitness history encoded without
    /// timestamps, for comparing state across pause/resume.
    pub fn evolution_state_bytes(&self) -> ModelResult<Vec<u8>> {
        serde_json::to_vec(&EvolutionState {
            current_generation: self.current_generation,
            population: &self.population,
            fitness_history: &self.fitness_history,
        })
        .map_err(|e| ModelError::Serialization(e.to_string()))
    }

    /// Validate every genome the session carries: the population and
    /// the best genome.
    pub fn validate_genomes(&self) -> ModelResult<()> {
        for genome in self.population.iter().chain(self.best_genome.as_ref()) {
            genome.validate()?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> ModelResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ModelError::Serialization(e.to_string()))
    }

    /// Decode a snapshot and check every genome it carries.
    pub fn from_bytes(bytes: &[u8]) -> ModelResult<Self> {
        let session: Self =
            serde_json::from_slice(bytes).map_err(|e| ModelError::MalformedPayload {
                position: (e.line() > 0).then(|| crate::error::PayloadPosition {
                    line: e.line(),
                    column: e.column(),
                }),
                message: e.to_string(),
            })?;
        session.validate_genomes()?;
        Ok(session)
    }
}
