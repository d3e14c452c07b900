//! Records exchanged with the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use telos_types::{FitnessScore, GenomeId, GoalGenome, SessionId};

/// One selected generation with the scores it was selected on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub agent_name: String,
    pub session_id: SessionId,
    pub generation: u32,
    pub genomes: Vec<GoalGenome>,
    pub scores: Vec<FitnessScore>,
    /// When the generation was produced; later records supersede earlier
    /// ones as the agent's latest population, regardless of write order.
    pub produced_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn new(
        agent_name: impl Into<String>,
        session_id: SessionId,
        generation: u32,
        genomes: Vec<GoalGenome>,
        scores: Vec<FitnessScore>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            session_id,
            generation,
            genomes,
            scores,
            produced_at: Utc::now(),
        }
    }

    pub fn score_of(&self, id: &GenomeId) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| &s.genome_id == id)
            .map(|s| s.aggregate_score)
    }
}

/// A notable fitness improvement worth remembering across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEntry {
    pub agent_name: String,
    pub session_id: SessionId,
    pub genome_id: GenomeId,
    pub generation: u32,
    pub aggregate_score: f64,
    pub previous_best: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// A stored genome paired with its best recorded score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGenome {
    pub genome: GoalGenome,
    pub best_score: Option<f64>,
}
