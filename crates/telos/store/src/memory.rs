//! In-memory [`GenomeStore`] implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use telos_types::{EvolutionSession, GenomeId, GoalGenome, LineageIndex, SessionId};

use crate::model::{GenerationRecord, LearningEntry, ScoredGenome};
use crate::traits::GenomeStore;
use crate::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct PopulationPointer {
    produced_at: DateTime<Utc>,
    genome_ids: Vec<GenomeId>,
}

/// Reference store kept entirely in process memory.
///
/// Sessions are held in their serialized form so restore exercises the
/// same encoding a durable backend would. [`InMemoryGenomeStore::set_available`]
/// simulates an outage: every call then fails with
/// [`StoreError::Unavailable`].
pub struct InMemoryGenomeStore {
    genomes: RwLock<HashMap<GenomeId, ScoredGenome>>,
    populations: RwLock<HashMap<String, PopulationPointer>>,
    sessions: RwLock<HashMap<SessionId, Vec<u8>>>,
    learning: RwLock<Vec<LearningEntry>>,
    available: AtomicBool,
}

impl Default for InMemoryGenomeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGenomeStore {
    pub fn new() -> Self {
        Self {
            genomes: RwLock::new(HashMap::new()),
            populations: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            learning: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn genome_count(&self) -> usize {
        self.genomes.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn contains(&self, id: &GenomeId) -> bool {
        self.genomes
            .read()
            .map(|g| g.contains_key(id))
            .unwrap_or(false)
    }

    pub fn learning_entries(&self) -> Vec<LearningEntry> {
        self.learning.read().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        }
    }
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Backend(format!("{what} lock poisoned"))
}

fn sort_best_first(genomes: &mut [ScoredGenome]) {
    genomes.sort_by(|a, b| {
        b.best_score
            .unwrap_or(f64::NEG_INFINITY)
            .partial_cmp(&a.best_score.unwrap_or(f64::NEG_INFINITY))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.genome.id.cmp(&b.genome.id))
    });
}

#[async_trait]
impl GenomeStore for InMemoryGenomeStore {
    async fn persist_generation(&self, record: GenerationRecord) -> StoreResult<()> {
        self.ensure_available()?;
        {
            let mut genomes = self.genomes.write().map_err(|_| poisoned("genomes"))?;

            for genome in &record.genomes {
                if let Some(existing) = genomes.get(&genome.id) {
                    let same_identity = existing.genome.parent_id == genome.parent_id
                        && existing.genome.generation == genome.generation
                        && existing.genome.objectives == genome.objectives;
                    if !same_identity {
                        return Err(StoreError::Conflict(format!(
                            "genome id {} reused for different content",
                            genome.id
                        )));
                    }
                }
            }

            for genome in &record.genomes {
                let score = record.score_of(&genome.id);
                let entry = genomes.entry(genome.id.clone()).or_insert_with(|| ScoredGenome {
                    genome: genome.clone(),
                    best_score: None,
                });
                entry.genome = genome.clone();
                entry.best_score = match (entry.best_score, score) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
            }
        }

        let mut populations = self.populations.write().map_err(|_| poisoned("populations"))?;
        let newer = populations
            .get(&record.agent_name)
            .map(|p| record.produced_at >= p.produced_at)
            .unwrap_or(true);
        if newer {
            populations.insert(
                record.agent_name.clone(),
                PopulationPointer {
                    produced_at: record.produced_at,
                    genome_ids: record.genomes.iter().map(|g| g.id.clone()).collect(),
                },
            );
        }
        Ok(())
    }

    async fn get_latest_population(&self, agent_name: &str) -> StoreResult<Vec<GoalGenome>> {
        self.ensure_available()?;
        let populations = self.populations.read().map_err(|_| poisoned("populations"))?;
        let genomes = self.genomes.read().map_err(|_| poisoned("genomes"))?;
        Ok(populations
            .get(agent_name)
            .map(|p| {
                p.genome_ids
                    .iter()
                    .filter_map(|id| genomes.get(id).map(|s| s.genome.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_genomes_by_fitness(
        &self,
        agent_name: &str,
        min_fitness: f64,
    ) -> StoreResult<Vec<ScoredGenome>> {
        self.ensure_available()?;
        let genomes = self.genomes.read().map_err(|_| poisoned("genomes"))?;
        let mut matches: Vec<ScoredGenome> = genomes
            .values()
            .filter(|s| s.genome.agent_name == agent_name)
            .filter(|s| s.best_score.map(|v| v >= min_fitness).unwrap_or(false))
            .cloned()
            .collect();
        sort_best_first(&mut matches);
        Ok(matches)
    }

    async fn get_genome_lineage(&self, genome_id: &GenomeId) -> StoreResult<Vec<GoalGenome>> {
        self.ensure_available()?;
        let genomes = self.genomes.read().map_err(|_| poisoned("genomes"))?;
        if !genomes.contains_key(genome_id) {
            return Err(StoreError::NotFound(format!("genome {genome_id}")));
        }
        let index = LineageIndex::from_genomes(genomes.values().map(|s| &s.genome));
        let chain = index.trace(genome_id)?;
        chain
            .iter()
            .map(|id| {
                genomes
                    .get(id)
                    .map(|s| s.genome.clone())
                    .ok_or_else(|| StoreError::NotFound(format!("genome {id}")))
            })
            .collect()
    }

    async fn get_portfolio_seeds(
        &self,
        exclude_agent: &str,
        min_fitness: f64,
        limit: usize,
    ) -> StoreResult<Vec<GoalGenome>> {
        self.ensure_available()?;
        let genomes = self.genomes.read().map_err(|_| poisoned("genomes"))?;
        let mut matches: Vec<ScoredGenome> = genomes
            .values()
            .filter(|s| s.genome.agent_name != exclude_agent)
            .filter(|s| s.best_score.map(|v| v >= min_fitness).unwrap_or(false))
            .cloned()
            .collect();
        sort_best_first(&mut matches);
        Ok(matches.into_iter().take(limit).map(|s| s.genome).collect())
    }

    async fn prune_old_genomes(&self, retention_days: u32) -> StoreResult<usize> {
        self.ensure_available()?;
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
        let mut genomes = self.genomes.write().map_err(|_| poisoned("genomes"))?;
        let before = genomes.len();
        genomes.retain(|_, s| s.genome.created_at >= cutoff);
        let removed = before - genomes.len();

        let mut populations = self.populations.write().map_err(|_| poisoned("populations"))?;
        for pointer in populations.values_mut() {
            pointer.genome_ids.retain(|id| genomes.contains_key(id));
        }
        Ok(removed)
    }

    async fn persist_session_state(&self, session: &EvolutionSession) -> StoreResult<()> {
        self.ensure_available()?;
        let bytes = session
            .to_bytes()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut sessions = self.sessions.write().map_err(|_| poisoned("sessions"))?;
        sessions.insert(session.id.clone(), bytes);
        Ok(())
    }

    async fn restore_session_state(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<EvolutionSession>> {
        self.ensure_available()?;
        let sessions = self.sessions.read().map_err(|_| poisoned("sessions"))?;
        sessions
            .get(session_id)
            .map(|bytes| EvolutionSession::from_bytes(bytes).map_err(StoreError::from))
            .transpose()
    }

    async fn record_learning(&self, entry: LearningEntry) -> StoreResult<()> {
        self.ensure_available()?;
        let mut learning = self.learning.write().map_err(|_| poisoned("learning"))?;
        learning.push(entry);
        Ok(())
    }
}

/// A store that is never reachable.
#[derive(Debug, Default, Clone)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn down<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("store unreachable".into()))
    }
}

#[async_trait]
impl GenomeStore for UnavailableStore {
    async fn persist_generation(&self, _record: GenerationRecord) -> StoreResult<()> {
        Self::down()
    }

    async fn get_latest_population(&self, _agent_name: &str) -> StoreResult<Vec<GoalGenome>> {
        Self::down()
    }

    async fn get_genomes_by_fitness(
        &self,
        _agent_name: &str,
        _min_fitness: f64,
    ) -> StoreResult<Vec<ScoredGenome>> {
        Self::down()
    }

    async fn get_genome_lineage(&self, _genome_id: &GenomeId) -> StoreResult<Vec<GoalGenome>> {
        Self::down()
    }

    async fn get_portfolio_seeds(
        &self,
        _exclude_agent: &str,
        _min_fitness: f64,
        _limit: usize,
    ) -> StoreResult<Vec<GoalGenome>> {
        Self::down()
    }

    async fn prune_old_genomes(&self, _retention_days: u32) -> StoreResult<usize> {
        Self::down()
    }

    async fn persist_session_state(&self, _session: &EvolutionSession) -> StoreResult<()> {
        Self::down()
    }

    async fn restore_session_state(
        &self,
        _session_id: &SessionId,
    ) -> StoreResult<Option<EvolutionSession>> {
        Self::down()
    }

    async fn record_learning(&self, _entry: LearningEntry) -> StoreResult<()> {
        Self::down()
    }
}
