//! Read-only summaries handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use telos_types::{EvolutionSession, GenomeId, SessionId, SessionMetrics, SessionStatus};

/// Result of one `run_iteration` call.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub session_id: SessionId,
    /// False when a budget check or pending control request ended the
    /// session before any work started.
    pub ran: bool,
    pub generation: u32,
    pub status: SessionStatus,
    pub weak: bool,
    pub best_score: Option<f64>,
    pub population_size: usize,
}

/// Summary of a session's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub agent_name: String,
    pub status: SessionStatus,
    pub current_generation: u32,
    pub population_size: usize,
    pub effective_population_size: usize,
    pub mutation_rate: f64,
    pub best_genome_id: Option<GenomeId>,
    pub best_score: Option<f64>,
    pub generations_recorded: usize,
    pub metrics: SessionMetrics,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&EvolutionSession> for SessionReport {
    fn from(session: &EvolutionSession) -> Self {
        Self {
            session_id: session.id.clone(),
            agent_name: session.agent_name.clone(),
            status: session.status,
            current_generation: session.current_generation,
            population_size: session.population.len(),
            effective_population_size: session.effective_population_size,
            mutation_rate: session.mutation_rate,
            best_genome_id: session.best_genome.as_ref().map(|g| g.id.clone()),
            best_score: session.best_score,
            generations_recorded: session.fitness_history.len(),
            metrics: session.metrics.clone(),
            created_at: session.created_at,
            finished_at: session.finished_at,
        }
    }
}
