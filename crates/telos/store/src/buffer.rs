//! Non-blocking persistence with a bounded retry buffer.
//!
//! Every store call is bounded by a timeout. A failed generation write is
//! kept in memory (at most `capacity` genomes, oldest dropped first) and
//! retried by [`BufferedPersistence::flush`] at the next checkpoint. The
//! newest unsaved session snapshot is kept the same way. Nothing here
//! retries on its own or waits for the store to come back: a flush stops
//! at the first unreachable-store error, so it costs at most one timeout.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use telos_types::{EvolutionSession, GoalGenome, SessionId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::model::{GenerationRecord, LearningEntry};
use crate::traits::GenomeStore;
use crate::{StoreError, StoreResult};

/// What happened to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Persisted,
    /// Kept for retry; `dropped` older genomes were evicted to make room.
    Buffered { dropped: usize },
}

/// Result of a flush attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub generations_written: usize,
    pub session_written: bool,
    pub learning_written: usize,
    pub genomes_still_buffered: usize,
    pub failures: usize,
    /// The store was unreachable and the remaining entries were not tried.
    pub interrupted: bool,
}

impl FlushReport {
    fn note_failure(&mut self, error: &StoreError) {
        self.failures += 1;
        self.interrupted = error.is_transient();
    }
}

#[derive(Default)]
struct Pending {
    generations: VecDeque<GenerationRecord>,
    session: Option<EvolutionSession>,
    learning: VecDeque<LearningEntry>,
    dropped_total: u64,
}

impl Pending {
    fn buffered_genomes(&self) -> usize {
        self.generations.iter().map(|r| r.genomes.len()).sum()
    }

    /// Evict oldest genomes until at most `capacity` remain.
    fn enforce_capacity(&mut self, capacity: usize) -> usize {
        let mut dropped = 0;
        while self.buffered_genomes() > capacity {
            let Some(oldest) = self.generations.front_mut() else {
                break;
            };
            if oldest.genomes.is_empty() {
                self.generations.pop_front();
                continue;
            }
            let removed = oldest.genomes.remove(0);
            oldest.scores.retain(|s| s.genome_id != removed.id);
            dropped += 1;
            if oldest.genomes.is_empty() {
                self.generations.pop_front();
            }
        }
        self.dropped_total += dropped as u64;
        dropped
    }
}

/// Wraps a [`GenomeStore`] with timeouts and a bounded write buffer.
#[derive(Clone)]
pub struct BufferedPersistence {
    store: Arc<dyn GenomeStore>,
    timeout: Duration,
    capacity: usize,
    pending: Arc<Mutex<Pending>>,
}

impl std::fmt::Debug for BufferedPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedPersistence")
            .field("timeout", &self.timeout)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl BufferedPersistence {
    pub fn new(store: Arc<dyn GenomeStore>) -> Self {
        Self {
            store,
            timeout: Duration::from_secs(5),
            capacity: 256,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn store(&self) -> &Arc<dyn GenomeStore> {
        &self.store
    }

    async fn bounded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "store call timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Persist a generation or buffer it for the next flush.
    pub async fn persist_generation(&self, record: GenerationRecord) -> WriteOutcome {
        let generation = record.generation;
        match self.bounded(self.store.persist_generation(record.clone())).await {
            Ok(()) => WriteOutcome::Persisted,
            Err(e) => {
                let mut pending = self.pending.lock().await;
                pending.generations.push_back(record);
                let dropped = pending.enforce_capacity(self.capacity);
                warn!(
                    generation,
                    error = %e,
                    buffered = pending.buffered_genomes(),
                    "Generation write failed, buffered for retry"
                );
                if dropped > 0 {
                    warn!(
                        dropped,
                        capacity = self.capacity,
                        "Write buffer full, dropped oldest genomes"
                    );
                }
                WriteOutcome::Buffered { dropped }
            }
        }
    }

    /// Persist a session snapshot, or keep it as the pending snapshot.
    pub async fn persist_session(&self, session: &EvolutionSession) -> WriteOutcome {
        match self.bounded(self.store.persist_session_state(session)).await {
            Ok(()) => {
                let mut pending = self.pending.lock().await;
                if pending.session.as_ref().map(|s| &s.id) == Some(&session.id) {
                    pending.session = None;
                }
                WriteOutcome::Persisted
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Session snapshot write failed");
                self.pending.lock().await.session = Some(session.clone());
                WriteOutcome::Buffered { dropped: 0 }
            }
        }
    }

    pub async fn record_learning(&self, entry: LearningEntry) -> WriteOutcome {
        match self.bounded(self.store.record_learning(entry.clone())).await {
            Ok(()) => WriteOutcome::Persisted,
            Err(e) => {
                warn!(genome_id = %entry.genome_id, error = %e, "Learning entry write failed");
                let mut pending = self.pending.lock().await;
                pending.learning.push_back(entry);
                let mut dropped = 0;
                while pending.learning.len() > self.capacity {
                    pending.learning.pop_front();
                    dropped += 1;
                }
                WriteOutcome::Buffered { dropped }
            }
        }
    }

    /// Retry everything buffered, oldest generation first, then the
    /// session snapshot, then learning entries. Entries that fail stay
    /// buffered. The first unreachable-store error ends the flush and
    /// every entry not yet tried goes back to the buffer untouched.
    pub async fn flush(&self) -> FlushReport {
        let (generations, session, learning) = {
            let mut pending = self.pending.lock().await;
            (
                std::mem::take(&mut pending.generations),
                pending.session.take(),
                std::mem::take(&mut pending.learning),
            )
        };
        let mut report = FlushReport::default();
        let mut failed_generations = VecDeque::new();
        let mut failed_learning = VecDeque::new();
        let mut failed_session = None;

        for record in generations {
            if report.interrupted {
                failed_generations.push_back(record);
                continue;
            }
            match self.bounded(self.store.persist_generation(record.clone())).await {
                Ok(()) => report.generations_written += 1,
                Err(e) => {
                    debug!(error = %e, "Buffered generation still not writable");
                    report.note_failure(&e);
                    failed_generations.push_back(record);
                }
            }
        }

        if let Some(snapshot) = session {
            if report.interrupted {
                failed_session = Some(snapshot);
            } else {
                match self.bounded(self.store.persist_session_state(&snapshot)).await {
                    Ok(()) => report.session_written = true,
                    Err(e) => {
                        report.note_failure(&e);
                        failed_session = Some(snapshot);
                    }
                }
            }
        }

        for entry in learning {
            if report.interrupted {
                failed_learning.push_back(entry);
                continue;
            }
            match self.bounded(self.store.record_learning(entry.clone())).await {
                Ok(()) => report.learning_written += 1,
                Err(e) => {
                    report.note_failure(&e);
                    failed_learning.push_back(entry);
                }
            }
        }
        if report.interrupted {
            warn!(
                generations = failed_generations.len(),
                learning = failed_learning.len(),
                "Store unreachable, flush deferred to next checkpoint"
            );
        }

        let mut pending = self.pending.lock().await;
        // Writes buffered while the flush ran are newer than the ones that failed here.
        failed_generations.append(&mut pending.generations);
        pending.generations = failed_generations;
        failed_learning.append(&mut pending.learning);
        pending.learning = failed_learning;
        if pending.session.is_none() {
            pending.session = failed_session;
        }
        pending.enforce_capacity(self.capacity);
        report.genomes_still_buffered = pending.buffered_genomes();
        report
    }

    /// Keep `session` as the pending snapshot without calling the store.
    pub async fn hold_session(&self, session: &EvolutionSession) {
        self.pending.lock().await.session = Some(session.clone());
    }

    pub async fn buffered_genomes(&self) -> usize {
        self.pending.lock().await.buffered_genomes()
    }

    pub async fn dropped_genomes(&self) -> u64 {
        self.pending.lock().await.dropped_total
    }

    pub async fn has_pending_session(&self) -> bool {
        self.pending.lock().await.session.is_some()
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub async fn latest_population(&self, agent_name: &str) -> StoreResult<Vec<GoalGenome>> {
        self.bounded(self.store.get_latest_population(agent_name)).await
    }

    pub async fn portfolio_seeds(
        &self,
        exclude_agent: &str,
        min_fitness: f64,
        limit: usize,
    ) -> StoreResult<Vec<GoalGenome>> {
        self.bounded(self.store.get_portfolio_seeds(exclude_agent, min_fitness, limit))
            .await
    }

    pub async fn restore_session(
        &self,
        session_id: &SessionId,
    ) -> StoreResult<Option<EvolutionSession>> {
        self.bounded(self.store.restore_session_state(session_id)).await
    }
}
