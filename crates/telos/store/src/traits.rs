use async_trait::async_trait;
use telos_types::{EvolutionSession, GenomeId, GoalGenome, SessionId};

use crate::model::{GenerationRecord, LearningEntry, ScoredGenome};
use crate::StoreResult;

/// Persistence collaborator for genomes, sessions and the learning log.
///
/// Implementations own retry and backoff. The core never retries a call
/// itself; it buffers failed writes (see [`crate::BufferedPersistence`]).
#[async_trait]
pub trait GenomeStore: Send + Sync {
    /// Persist a selected generation and its scores.
    async fn persist_generation(&self, record: GenerationRecord) -> StoreResult<()>;

    /// Most recently produced population for `agent_name`; empty if none.
    async fn get_latest_population(&self, agent_name: &str) -> StoreResult<Vec<GoalGenome>>;

    /// Genomes of `agent_name` whose best score is at least `min_fitness`,
    /// best first.
    async fn get_genomes_by_fitness(
        &self,
        agent_name: &str,
        min_fitness: f64,
    ) -> StoreResult<Vec<ScoredGenome>>;

    /// Chain from `genome_id` back to its seed, inclusive.
    async fn get_genome_lineage(&self, genome_id: &GenomeId) -> StoreResult<Vec<GoalGenome>>;

    /// High-scoring genomes from agents other than `exclude_agent`, best
    /// first, at most `limit`.
    async fn get_portfolio_seeds(
        &self,
        exclude_agent: &str,
        min_fitness: f64,
        limit: usize,
    ) -> StoreResult<Vec<GoalGenome>>;

    /// Delete genomes created more than `retention_days` ago; returns how
    /// many were removed.
    async fn prune_old_genomes(&self, retention_days: u32) -> StoreResult<usize>;

    async fn persist_session_state(&self, session: &EvolutionSession) -> StoreResult<()>;

    async fn restore_session_state(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<EvolutionSession>>;

    /// Append to the learning log.
    async fn record_learning(&self, entry: LearningEntry) -> StoreResult<()>;
}
