//! Session manager: owns evolution sessions and drives their outer loop.
//!
//! Each session lives in its own slot, addressed by [`SessionId`]. A slot
//! holds the session behind an async mutex that an iteration keeps for its
//! whole duration, so control requests (pause, graceful stop) naturally
//! wait for the in-flight iteration to finish. An immediate stop is
//! signalled through a watch channel and aborts the in-flight iteration,
//! discarding its partial results.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use telos_curriculum::{CurriculumGenerator, LadderCurriculum};
use telos_engine::{
    CritiqueCollaborator, CritiqueStatus, ExecutionHarness, GenerationOutcome, GenerationParams,
    InnerLoop, NoopCritique, OuterLoop,
};
use telos_fitness::{FitnessEvaluator, NoveltyMetric, ObjectiveSpaceNovelty};
use telos_guard::{
    AlignmentGuard, AlignmentPattern, ConflictComparator, PatternBook, RuleComparator,
};
use telos_mutation::MutationEngine;
use telos_store::{
    BufferedPersistence, FlushReport, GenerationRecord, GenomeStore, LearningEntry, WriteOutcome,
};
use telos_types::{EvolutionSession, GenomeId, GoalGenome, SessionConfig, SessionId, SessionStatus};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::budget::{
    assess_memory, exceeded_budget, iterations_exhausted, MemoryProbe, MemoryVerdict,
    SerializedSizeProbe,
};
use crate::error::{SessionError, SessionResult};
use crate::report::{IterationReport, SessionReport};

/// How a stop request treats the in-flight iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Let the current iteration finish and keep its results.
    Graceful,
    /// Abort the current iteration; the last completed generation is final.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Pause,
    Stop(StopMode),
}

struct SessionState {
    session: EvolutionSession,
    rng: StdRng,
    last_checkpoint: Instant,
}

struct SessionSlot {
    state: Mutex<SessionState>,
    control: watch::Sender<Control>,
    persistence: BufferedPersistence,
}

impl SessionSlot {
    fn new(session: EvolutionSession, persistence: BufferedPersistence) -> Self {
        let rng = session_rng(&session);
        let (control, _) = watch::channel(Control::Run);
        Self {
            state: Mutex::new(SessionState {
                session,
                rng,
                last_checkpoint: Instant::now(),
            }),
            control,
            persistence,
        }
    }
}

/// Seeded runs derive a per-generation stream so a restored session does
/// not replay the random choices of the generations before it.
fn session_rng(session: &EvolutionSession) -> StdRng {
    match session.config.rng_seed {
        Some(seed) => {
            StdRng::seed_from_u64(seed.wrapping_add(u64::from(session.current_generation)))
        }
        None => StdRng::from_entropy(),
    }
}

/// Cloneable handle over every session this process drives.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<SessionSlot>>>>,
    store: Arc<dyn GenomeStore>,
    harness: Arc<dyn ExecutionHarness>,
    critique: Arc<dyn CritiqueCollaborator>,
    novelty: Arc<dyn NoveltyMetric>,
    comparator: Arc<dyn ConflictComparator>,
    generator: Arc<dyn CurriculumGenerator>,
    probe: Arc<dyn MemoryProbe>,
    patterns: PatternBook,
    mutation: MutationEngine,
}

impl SessionManager {
    pub fn new(store: Arc<dyn GenomeStore>, harness: Arc<dyn ExecutionHarness>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            harness,
            critique: Arc::new(NoopCritique),
            novelty: Arc::new(ObjectiveSpaceNovelty::default()),
            comparator: Arc::new(RuleComparator),
            generator: Arc::new(LadderCurriculum::new()),
            probe: Arc::new(SerializedSizeProbe),
            patterns: PatternBook::new(),
            mutation: MutationEngine::new(),
        }
    }

    pub fn with_critique(mut self, critique: Arc<dyn CritiqueCollaborator>) -> Self {
        self.critique = critique;
        self
    }

    pub fn with_novelty(mut self, novelty: Arc<dyn NoveltyMetric>) -> Self {
        self.novelty = novelty;
        self
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn ConflictComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn CurriculumGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_patterns(mut self, patterns: PatternBook) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_mutation(mut self, mutation: MutationEngine) -> Self {
        self.mutation = mutation;
        self
    }

    /// Shared pattern book; edits apply from the next iteration on.
    pub fn pattern_book(&self) -> PatternBook {
        self.patterns.clone()
    }

    /// Insert or replace patterns. Running sessions see them at their next
    /// iteration.
    pub fn update_patterns(&self, patterns: Vec<AlignmentPattern>) -> SessionResult<()> {
        for pattern in patterns {
            info!(
                pattern_id = %pattern.id,
                success_score = pattern.success_score,
                "Alignment pattern updated"
            );
            self.patterns.upsert(pattern)?;
        }
        Ok(())
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Snapshot of the session record.
    pub async fn session(&self, id: &SessionId) -> SessionResult<EvolutionSession> {
        let slot = self.slot(id).await?;
        let state = slot.state.lock().await;
        Ok(state.session.clone())
    }

    pub async fn report(&self, id: &SessionId) -> SessionResult<SessionReport> {
        let slot = self.slot(id).await?;
        let state = slot.state.lock().await;
        Ok(SessionReport::from(&state.session))
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Create a running session for `agent_name`.
    ///
    /// The initial population is the agent's latest persisted population,
    /// or `seeds` when the store has none that validate, topped up with portfolio seeds
    /// from other agents and truncated to `population_size`.
    #[instrument(skip(self, seeds, config), fields(agent = %agent_name))]
    pub async fn start_session(
        &self,
        agent_name: &str,
        seeds: Vec<GoalGenome>,
        config: SessionConfig,
    ) -> SessionResult<SessionId> {
        config
            .validate()
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        for seed in &seeds {
            seed.validate()?;
        }

        let persistence = self.persistence_for(&config);
        let mut session = EvolutionSession::new(agent_name, config);
        session.population = initial_population(&persistence, &mut session, seeds).await?;

        let id = session.id.clone();
        let population = session.population.len();
        let slot = Arc::new(SessionSlot::new(session, persistence));
        {
            let mut state = slot.state.lock().await;
            // generation 0 keeps every later genome's lineage traceable in the store
            let record = GenerationRecord::new(
                state.session.agent_name.clone(),
                id.clone(),
                0,
                state.session.population.clone(),
                Vec::new(),
            );
            let outcome = slot.persistence.persist_generation(record).await;
            if let WriteOutcome::Buffered { dropped } = outcome {
                state.session.metrics.store_failures += 1;
                state.session.metrics.dropped_genomes += dropped as u64;
            }
            checkpoint_locked(&slot, &mut state).await;
        }
        self.sessions.write().await.insert(id.clone(), slot);

        info!(session_id = %id, population, "Evolution session started");
        Ok(id)
    }

    /// Run one outer-loop iteration.
    ///
    /// Budgets are checked first; a session whose budget is already spent
    /// transitions to `BudgetExceeded` without starting the iteration.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn run_iteration(&self, id: &SessionId) -> SessionResult<IterationReport> {
        let slot = self.slot(id).await?;
        let mut state = slot.state.lock().await;

        if honor_control(&slot, &mut state).await? {
            return Ok(iteration_report(&state.session, false, false));
        }
        if state.session.status != SessionStatus::Running {
            return Err(SessionError::NotRunning {
                id: id.clone(),
                status: state.session.status,
            });
        }

        // ── Budgets ──
        let used = self.probe.measure(&state.session);
        state.session.metrics.observe_memory(used);
        let verdict = assess_memory(&state.session, used);
        if let Some(budget) = exceeded_budget(&state.session, verdict) {
            warn!(%budget, "Budget exceeded, ending session before iteration");
            finish(&slot, &mut state, SessionStatus::BudgetExceeded { budget }).await?;
            return Ok(iteration_report(&state.session, false, false));
        }
        match verdict {
            MemoryVerdict::Reduce { from, to } => {
                warn!(used, from, to, "Memory pressure, halving population size");
                state.session.effective_population_size = to;
                state.session.memory_reduced = true;
            }
            MemoryVerdict::Pressure => {
                warn!(used, "Memory pressure persists after population reduction");
            }
            MemoryVerdict::WithinBudget | MemoryVerdict::Exceeded => {}
        }

        // ── Generation ──
        let params = GenerationParams::from_session(&state.session);
        let patterns = self.patterns.snapshot()?;
        let outer = self.outer_loop(&state.session.config);
        let generation = state.session.current_generation + 1;
        let mut control = slot.control.subscribe();
        let started = Instant::now();

        let SessionState { session, rng, .. } = &mut *state;
        let result = tokio::select! {
            biased;
            _ = abort_requested(&mut control) => None,
            result = outer.run_generation(
                &session.population,
                &session.population_scores,
                &patterns,
                &params,
                generation,
                rng,
            ) => Some(result),
        };
        let elapsed = started.elapsed();
        state.session.metrics.compute_time_ms += elapsed.as_millis() as u64;

        let outcome = match result {
            None => {
                info!(generation, "Iteration aborted, discarding partial results");
                return Ok(iteration_report(&state.session, false, false));
            }
            Some(Err(e)) => {
                if e.is_hard_failure() {
                    error!(error = %e, "Hard failure in outer loop, stopping session");
                    finish(&slot, &mut state, SessionStatus::Stopped).await?;
                }
                return Err(e.into());
            }
            Some(Ok(outcome)) => outcome,
        };

        let weak = outcome.weak;
        commit(&slot, &mut state.session, outcome, elapsed).await;

        if iterations_exhausted(&state.session) {
            finish(&slot, &mut state, SessionStatus::Completed).await?;
        } else if state.last_checkpoint.elapsed() >= state.session.config.checkpoint_interval() {
            checkpoint_locked(&slot, &mut state).await;
        }
        Ok(iteration_report(&state.session, true, weak))
    }

    /// Drive the session until it pauses or reaches a terminal state.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn run(&self, id: &SessionId) -> SessionResult<SessionReport> {
        loop {
            match self.run_iteration(id).await {
                Ok(report) if report.status == SessionStatus::Running => continue,
                Ok(_) | Err(SessionError::NotRunning { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        self.report(id).await
    }

    /// Drive the session on a background task.
    pub fn spawn(&self, id: SessionId) -> JoinHandle<SessionResult<SessionReport>> {
        let manager = self.clone();
        tokio::spawn(async move { manager.run(&id).await })
    }

    /// Pause at the next iteration boundary and checkpoint.
    ///
    /// Waits for an in-flight iteration to finish; never interrupts one.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn pause(&self, id: &SessionId) -> SessionResult<SessionReport> {
        let slot = self.slot(id).await?;
        slot.control.send_replace(Control::Pause);
        let mut state = slot.state.lock().await;
        if state.session.status != SessionStatus::Paused {
            finish(&slot, &mut state, SessionStatus::Paused).await?;
        }
        Ok(SessionReport::from(&state.session))
    }

    /// Resume a paused session held by this manager.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn resume(&self, id: &SessionId) -> SessionResult<SessionReport> {
        let slot = self.slot(id).await?;
        let mut state = slot.state.lock().await;
        if state.session.status != SessionStatus::Running {
            state.session.transition(SessionStatus::Running)?;
        }
        slot.control.send_replace(Control::Run);
        info!(generation = state.session.current_generation, "Session resumed");
        Ok(SessionReport::from(&state.session))
    }

    /// Load a session from the store and resume it.
    ///
    /// Population, generation counter and fitness history come back
    /// exactly as they were persisted. A snapshot carrying a genome that
    /// fails validation is refused.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn resume_from_store(&self, id: &SessionId) -> SessionResult<SessionReport> {
        let loader = BufferedPersistence::new(self.store.clone());
        let mut session = loader
            .restore_session(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        if let Err(e) = session.validate_genomes() {
            error!(error = %e, "Restored session carries an invalid genome");
            return Err(e.into());
        }
        if session.status != SessionStatus::Running {
            session.transition(SessionStatus::Running)?;
        }

        let report = SessionReport::from(&session);
        let persistence = self.persistence_for(&session.config);
        let slot = Arc::new(SessionSlot::new(session, persistence));
        self.sessions.write().await.insert(id.clone(), slot);
        info!(generation = report.current_generation, "Session restored from store");
        Ok(report)
    }

    /// Stop the session. A graceful stop waits for the in-flight iteration;
    /// an immediate one aborts it.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn stop(&self, id: &SessionId, mode: StopMode) -> SessionResult<SessionReport> {
        let slot = self.slot(id).await?;
        slot.control.send_replace(Control::Stop(mode));
        let mut state = slot.state.lock().await;
        if !state.session.is_terminal() {
            finish(&slot, &mut state, SessionStatus::Stopped).await?;
        }
        Ok(SessionReport::from(&state.session))
    }

    /// Retry buffered writes and persist the session snapshot now.
    pub async fn checkpoint(&self, id: &SessionId) -> SessionResult<FlushReport> {
        let slot = self.slot(id).await?;
        let mut state = slot.state.lock().await;
        Ok(checkpoint_locked(&slot, &mut state).await)
    }

    // ── Internals ───────────────────────────────────────────────────────

    async fn slot(&self, id: &SessionId) -> SessionResult<Arc<SessionSlot>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    fn persistence_for(&self, config: &SessionConfig) -> BufferedPersistence {
        BufferedPersistence::new(self.store.clone())
            .with_timeout(config.store_timeout())
            .with_capacity(config.store_buffer_capacity)
    }

    fn outer_loop(&self, config: &SessionConfig) -> OuterLoop {
        let guard = AlignmentGuard::new().with_comparator(self.comparator.clone());
        let evaluator = FitnessEvaluator::new()
            .with_weights(config.fitness_weights)
            .with_novelty(self.novelty.clone())
            .with_guard(guard.clone());
        let inner = InnerLoop::new(self.harness.clone())
            .with_generator(self.generator.clone())
            .with_max_tasks(config.inner_loop_max_tasks);
        OuterLoop::new(inner)
            .with_mutation(self.mutation.clone())
            .with_guard(guard)
            .with_evaluator(evaluator)
            .with_critique(self.critique.clone())
    }
}

async fn initial_population(
    persistence: &BufferedPersistence,
    session: &mut EvolutionSession,
    seeds: Vec<GoalGenome>,
) -> SessionResult<Vec<GoalGenome>> {
    let agent = session.agent_name.clone();
    let size = session.config.population_size;

    let stored = match persistence.latest_population(&agent).await {
        Ok(latest) => admit_stored(session, latest),
        Err(e) => {
            warn!(error = %e, "Could not load latest population, using caller seeds");
            session.metrics.store_failures += 1;
            Vec::new()
        }
    };
    let mut population = if stored.is_empty() {
        seeds
    } else {
        info!(count = stored.len(), "Continuing from latest persisted population");
        stored
    };

    let mut seen: BTreeSet<GenomeId> = BTreeSet::new();
    population.retain(|g| seen.insert(g.id.clone()));

    let room = size
        .saturating_sub(population.len())
        .min(session.config.portfolio_seed_limit());
    if room > 0 {
        match persistence
            .portfolio_seeds(&agent, session.config.min_fitness_threshold, room)
            .await
        {
            Ok(extra) => {
                let before = population.len();
                let extra = admit_stored(session, extra);
                population.extend(
                    extra
                        .into_iter()
                        .filter(|g| seen.insert(g.id.clone()))
                        .take(room),
                );
                debug!(added = population.len() - before, "Portfolio seeds added");
            }
            Err(e) => {
                warn!(error = %e, "Portfolio seeds unavailable");
                session.metrics.store_failures += 1;
            }
        }
    }

    population.truncate(size);
    if population.is_empty() {
        return Err(SessionError::NoSeeds(agent));
    }
    Ok(population)
}

/// Keep the store-sourced genomes that pass validation; count the rest.
fn admit_stored(session: &mut EvolutionSession, genomes: Vec<GoalGenome>) -> Vec<GoalGenome> {
    genomes
        .into_iter()
        .filter(|genome| match genome.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(genome_id = %genome.id, error = %e, "Rejected stored genome");
                session.metrics.rejected_store_genomes += 1;
                false
            }
        })
        .collect()
}

/// Apply a pending pause or stop request. Returns true when one was applied.
async fn honor_control(slot: &SessionSlot, state: &mut SessionState) -> SessionResult<bool> {
    let control = *slot.control.borrow();
    let next = match control {
        Control::Pause if state.session.status == SessionStatus::Running => SessionStatus::Paused,
        Control::Stop(_) if !state.session.is_terminal() => SessionStatus::Stopped,
        _ => return Ok(false),
    };
    finish(slot, state, next).await?;
    Ok(true)
}

/// Transition and checkpoint.
async fn finish(
    slot: &SessionSlot,
    state: &mut SessionState,
    next: SessionStatus,
) -> SessionResult<()> {
    state.session.transition(next)?;
    info!(
        status = %next,
        generation = state.session.current_generation,
        iterations = state.session.metrics.iterations_run,
        "Session state changed"
    );
    checkpoint_locked(slot, state).await;
    Ok(())
}

async fn checkpoint_locked(slot: &SessionSlot, state: &mut SessionState) -> FlushReport {
    let report = slot.persistence.flush().await;
    let session = &mut state.session;
    session.metrics.store_failures += report.failures as u64;
    session.last_checkpoint_at = Some(Utc::now());
    if report.interrupted {
        slot.persistence.hold_session(session).await;
        session.metrics.store_failures += 1;
    } else if let WriteOutcome::Buffered { .. } = slot.persistence.persist_session(session).await {
        session.metrics.store_failures += 1;
    }
    state.last_checkpoint = Instant::now();
    debug!(
        generations_written = report.generations_written,
        still_buffered = report.genomes_still_buffered,
        "Checkpoint"
    );
    report
}

/// Swap in the generation's results and persist them.
async fn commit(
    slot: &SessionSlot,
    session: &mut EvolutionSession,
    outcome: GenerationOutcome,
    elapsed: Duration,
) {
    let improvement = if outcome.weak {
        None
    } else {
        outcome
            .best()
            .filter(|(_, score)| session.best_score.map_or(true, |b| score.aggregate_score > b))
            .map(|(genome, score)| (genome.clone(), score.aggregate_score))
    };

    let GenerationOutcome {
        generation,
        population,
        scores,
        candidate_scores,
        weak,
        next_mutation_rate,
        stats,
    } = outcome;

    session.current_generation = generation;
    session.mutation_rate = next_mutation_rate;
    session.fitness_history.push(candidate_scores);

    let metrics = &mut session.metrics;
    metrics.iterations_run += 1;
    metrics.candidates_generated += stats.offspring as u64;
    metrics.candidates_rejected += stats.rejected as u64;
    metrics.harness_failures += stats.harness_failures as u64;
    metrics.partial_cycles += stats.partial_cycles as u64;
    if weak {
        metrics.weak_generations += 1;
    }
    match stats.critique {
        CritiqueStatus::FellBack(_) => metrics.critique_fallbacks += 1,
        CritiqueStatus::Applied { excluded, .. } => metrics.critique_exclusions += excluded as u64,
        CritiqueStatus::Disabled => {}
    }
    for conflict in stats.conflicts {
        metrics.record_conflict(conflict);
    }

    debug!(
        generation,
        weak,
        elapsed_ms = elapsed.as_millis() as u64,
        "Committing generation"
    );

    if !weak {
        session.population = population;
        session.population_scores = scores;
        let record = GenerationRecord::new(
            session.agent_name.clone(),
            session.id.clone(),
            generation,
            session.population.clone(),
            session.population_scores.clone(),
        );
        let outcome = slot.persistence.persist_generation(record).await;
        if let WriteOutcome::Buffered { dropped } = outcome {
            session.metrics.store_failures += 1;
            session.metrics.dropped_genomes += dropped as u64;
        }
    }

    if let Some((genome, score)) = improvement {
        let previous_best = session.best_score.replace(score);
        info!(
            genome_id = %genome.id.short(),
            score,
            previous = previous_best.unwrap_or(0.0),
            "New best genome"
        );
        if score >= session.config.notable_fitness_threshold {
            let entry = LearningEntry {
                agent_name: session.agent_name.clone(),
                session_id: session.id.clone(),
                genome_id: genome.id.clone(),
                generation,
                aggregate_score: score,
                previous_best,
                recorded_at: Utc::now(),
            };
            session.metrics.learning_entries += 1;
            if let WriteOutcome::Buffered { .. } = slot.persistence.record_learning(entry).await {
                session.metrics.store_failures += 1;
            }
        }
        session.best_genome = Some(genome);
    }
    session.touch();
}

async fn abort_requested(control: &mut watch::Receiver<Control>) {
    loop {
        if *control.borrow_and_update() == Control::Stop(StopMode::Immediate) {
            return;
        }
        if control.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn iteration_report(session: &EvolutionSession, ran: bool, weak: bool) -> IterationReport {
    IterationReport {
        session_id: session.id.clone(),
        ran,
        generation: session.current_generation,
        status: session.status,
        weak,
        best_score: session.best_score,
        population_size: session.population.len(),
    }
}
