//! Outer loop: one generation of mutate, guard, measure, score, select.
//!
//! ```text
//!  population ──mutate──▶ offspring
//!       └────────┬─────────────┘
//!             guard ──▶ rejected (conflicts logged)
//!               │
//!        inner loops (concurrent)
//!               │
//!            evaluate ──▶ critique (optional, top N)
//!               │
//!      threshold met? ── no ──▶ retain population, raise mutation rate
//!               │ yes
//!          tournament ──▶ next population
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use telos_fitness::{FitnessEvaluator, TournamentSelector};
use telos_guard::{AlignmentGuard, AlignmentPattern};
use telos_mutation::MutationEngine;
use telos_types::{Conflict, EvolutionSession, FitnessScore, GenomeId, GoalGenome};
use tracing::{debug, info, instrument, warn};

use crate::critique::{run_critique, CritiqueCollaborator, CritiqueRequest, NoopCritique};
use crate::error::{EngineError, EngineResult};
use crate::inner::InnerLoop;

// ── Parameters ──────────────────────────────────────────────────────────

/// Per-generation knobs, taken from the session's config and its current
/// adaptive state.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    pub population_size: usize,
    pub mutation_rate: f64,
    pub initial_mutation_rate: f64,
    pub max_mutation_rate: f64,
    pub min_fitness_threshold: f64,
    pub tournament_size: usize,
    pub enable_critique: bool,
    pub critique_top_n: usize,
    pub critique_timeout: Duration,
    pub critique_weight: f64,
}

impl GenerationParams {
    pub fn from_session(session: &EvolutionSession) -> Self {
        let config = &session.config;
        Self {
            population_size: session.effective_population_size,
            mutation_rate: session.mutation_rate,
            initial_mutation_rate: config.initial_mutation_rate,
            max_mutation_rate: config.max_mutation_rate,
            min_fitness_threshold: config.min_fitness_threshold,
            tournament_size: config.tournament_size,
            enable_critique: config.enable_critique,
            critique_top_n: config.critique_top_n,
            critique_timeout: config.critique_timeout(),
            critique_weight: config.critique_weight,
        }
    }

    fn raised_mutation_rate(&self) -> f64 {
        (self.mutation_rate * 2.0).min(self.max_mutation_rate)
    }
}

// ── Outcome ─────────────────────────────────────────────────────────────

/// What happened to the critique step this generation.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CritiqueStatus {
    #[default]
    Disabled,
    Applied {
        reviewers: usize,
        excluded: usize,
    },
    FellBack(String),
}

#[derive(Clone, Debug, Default)]
pub struct GenerationStats {
    pub offspring: usize,
    pub mutation_failures: usize,
    pub rejected: usize,
    pub conflicts: Vec<Conflict>,
    pub evaluated: usize,
    pub partial_cycles: usize,
    pub harness_failures: usize,
    /// Sum of task durations reported by the harness.
    pub task_time: Duration,
    pub critique: CritiqueStatus,
}

/// Result of one outer-loop generation.
#[derive(Clone, Debug)]
pub struct GenerationOutcome {
    /// Number of the generation just produced.
    pub generation: u32,
    /// Next population; the prior one when the generation was weak.
    pub population: Vec<GoalGenome>,
    /// Scores aligned with `population`.
    pub scores: Vec<FitnessScore>,
    /// Aggregate score of every evaluated candidate, best first.
    pub candidate_scores: Vec<f64>,
    pub weak: bool,
    pub next_mutation_rate: f64,
    pub stats: GenerationStats,
}

impl GenerationOutcome {
    /// Highest-scoring member of the next population.
    pub fn best(&self) -> Option<(&GoalGenome, &FitnessScore)> {
        self.population
            .iter()
            .zip(&self.scores)
            .max_by(|a, b| {
                a.1.aggregate_score
                    .total_cmp(&b.1.aggregate_score)
                    .then_with(|| b.0.id.cmp(&a.0.id))
            })
    }
}

// ── Outer Loop ──────────────────────────────────────────────────────────

pub struct OuterLoop {
    mutation: MutationEngine,
    guard: AlignmentGuard,
    evaluator: FitnessEvaluator,
    inner: InnerLoop,
    critique: Arc<dyn CritiqueCollaborator>,
}

impl OuterLoop {
    pub fn new(inner: InnerLoop) -> Self {
        Self {
            mutation: MutationEngine::new(),
            guard: AlignmentGuard::new(),
            evaluator: FitnessEvaluator::new(),
            inner,
            critique: Arc::new(NoopCritique),
        }
    }

    pub fn with_mutation(mut self, mutation: MutationEngine) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_guard(mut self, guard: AlignmentGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_evaluator(mut self, evaluator: FitnessEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_critique(mut self, critique: Arc<dyn CritiqueCollaborator>) -> Self {
        self.critique = critique;
        self
    }

    pub fn guard(&self) -> &AlignmentGuard {
        &self.guard
    }

    /// Produce generation `generation` from `population`.
    ///
    /// `previous_scores` are the scores `population` was selected on and
    /// are carried forward if this generation turns out weak. `patterns`
    /// is a snapshot taken by the caller at the start of the iteration.
    #[instrument(skip_all, fields(generation = generation, population = population.len()))]
    pub async fn run_generation<R: Rng + Send>(
        &self,
        population: &[GoalGenome],
        previous_scores: &[FitnessScore],
        patterns: &[AlignmentPattern],
        params: &GenerationParams,
        generation: u32,
        rng: &mut R,
    ) -> EngineResult<GenerationOutcome> {
        if population.is_empty() {
            return Err(EngineError::EmptyPopulation);
        }
        let mut stats = GenerationStats::default();

        // ── Mutate ──
        let offspring_count = (population.len() as f64 * params.mutation_rate).ceil() as usize;
        let mut candidates: Vec<GoalGenome> = population.to_vec();
        for _ in 0..offspring_count.max(1) {
            let Some(parent) = population.choose(rng) else {
                break;
            };
            match self.mutation.mutate(parent, None, population, rng) {
                Ok(child) => {
                    stats.offspring += 1;
                    candidates.push(child);
                }
                Err(e) if e.is_hard_failure() => return Err(e.into()),
                Err(e) => {
                    debug!(parent = %parent.id.short(), error = %e, "Mutation produced no child");
                    stats.mutation_failures += 1;
                }
            }
        }

        // ── Guard ──
        let filtered = self.guard.filter_candidates(candidates, patterns);
        stats.rejected = filtered.rejected.len();
        stats.conflicts = filtered.conflicts().cloned().collect();
        let survivors = filtered.passed;
        if survivors.is_empty() {
            warn!(rejected = stats.rejected, "Every candidate conflicted with alignment patterns");
            return Ok(retained(population, previous_scores, params, generation, Vec::new(), stats));
        }

        // ── Inner loops ──
        let results = join_all(survivors.iter().map(|g| self.inner.run(g))).await;
        let measured: Vec<GoalGenome> = survivors
            .iter()
            .zip(&results)
            .map(|(genome, result)| {
                if result.partial {
                    stats.partial_cycles += 1;
                }
                if result.harness_error.is_some() {
                    stats.harness_failures += 1;
                }
                stats.task_time += result.total_duration;
                genome.record_measurements(&result.measurements())
            })
            .collect();

        // ── Evaluate ──
        let mut scored: Vec<(GoalGenome, FitnessScore)> = measured
            .iter()
            .zip(&results)
            .map(|(genome, result)| {
                let score = self.evaluator.evaluate(genome, result, &measured, patterns);
                (genome.clone(), score)
            })
            .collect();
        stats.evaluated = scored.len();
        sort_best_first(&mut scored);

        // ── Critique ──
        if params.enable_critique {
            scored = self.critique_step(scored, params, &mut stats).await;
        }

        let candidate_scores: Vec<f64> = scored.iter().map(|(_, s)| s.aggregate_score).collect();
        let meets_threshold = scored
            .iter()
            .any(|(_, s)| s.meets(params.min_fitness_threshold));
        if !meets_threshold {
            info!(
                best = candidate_scores.first().copied().unwrap_or(0.0),
                threshold = params.min_fitness_threshold,
                "Weak generation, retaining prior population"
            );
            return Ok(retained(
                population,
                previous_scores,
                params,
                generation,
                candidate_scores,
                stats,
            ));
        }

        // ── Select ──
        let selector = TournamentSelector::new(params.tournament_size)?;
        let scores: Vec<FitnessScore> = scored.iter().map(|(_, s)| s.clone()).collect();
        let selections = selector.select(&scores, params.population_size, rng)?;

        let mut chosen: Vec<GenomeId> = Vec::with_capacity(params.population_size);
        let mut seen: BTreeSet<GenomeId> = BTreeSet::new();
        for selection in selections {
            if seen.insert(selection.genome_id.clone()) {
                chosen.push(selection.genome_id);
            }
        }
        // duplicates leave gaps; fill with the best unselected candidates
        for (genome, _) in &scored {
            if chosen.len() >= params.population_size {
                break;
            }
            if seen.insert(genome.id.clone()) {
                chosen.push(genome.id.clone());
            }
        }

        let mut next_population = Vec::with_capacity(chosen.len());
        let mut next_scores = Vec::with_capacity(chosen.len());
        for id in &chosen {
            if let Some((genome, score)) = scored.iter().find(|(g, _)| &g.id == id) {
                next_population.push(genome.clone());
                next_scores.push(score.clone());
            }
        }

        info!(
            generation,
            offspring = stats.offspring,
            rejected = stats.rejected,
            selected = next_population.len(),
            best = candidate_scores.first().copied().unwrap_or(0.0),
            "Generation complete"
        );

        Ok(GenerationOutcome {
            generation,
            population: next_population,
            scores: next_scores,
            candidate_scores,
            weak: false,
            next_mutation_rate: params.initial_mutation_rate,
            stats,
        })
    }

    async fn critique_step(
        &self,
        scored: Vec<(GoalGenome, FitnessScore)>,
        params: &GenerationParams,
        stats: &mut GenerationStats,
    ) -> Vec<(GoalGenome, FitnessScore)> {
        let requests: Vec<CritiqueRequest> = scored
            .iter()
            .take(params.critique_top_n)
            .map(|(genome, score)| CritiqueRequest {
                genome: genome.clone(),
                score: score.clone(),
            })
            .collect();
        if requests.is_empty() {
            return scored;
        }

        match run_critique(self.critique.as_ref(), &requests, params.critique_timeout).await {
            Ok(report) => {
                stats.critique = CritiqueStatus::Applied {
                    reviewers: report.reviewers,
                    excluded: report.excluded.len(),
                };
                let mut revised: Vec<(GoalGenome, FitnessScore)> = scored
                    .into_iter()
                    .filter_map(|(genome, score)| {
                        report
                            .apply(score, params.critique_weight)
                            .map(|score| (genome, score))
                    })
                    .collect();
                sort_best_first(&mut revised);
                revised
            }
            Err(e) => {
                warn!(
                    collaborator = self.critique.name(),
                    error = %e,
                    "Critique unavailable, using fitness scores alone"
                );
                stats.critique = CritiqueStatus::FellBack(e.to_string());
                scored
            }
        }
    }
}

fn sort_best_first(scored: &mut [(GoalGenome, FitnessScore)]) {
    scored.sort_by(|a, b| {
        b.1.aggregate_score
            .total_cmp(&a.1.aggregate_score)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
}

fn retained(
    population: &[GoalGenome],
    previous_scores: &[FitnessScore],
    params: &GenerationParams,
    generation: u32,
    candidate_scores: Vec<f64>,
    stats: GenerationStats,
) -> GenerationOutcome {
    GenerationOutcome {
        generation,
        population: population.to_vec(),
        scores: previous_scores.to_vec(),
        candidate_scores,
        weak: true,
        next_mutation_rate: params.raised_mutation_rate(),
        stats,
    }
}
