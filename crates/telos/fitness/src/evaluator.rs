//! Combines task performance, novelty and taste alignment into one score.

use std::sync::Arc;

use telos_guard::{AlignmentGuard, AlignmentPattern};
use telos_types::{FitnessScore, FitnessWeights, GoalGenome, InnerLoopResult, ObjectiveBreakdown};
use tracing::debug;

use crate::novelty::{NoveltyMetric, ObjectiveSpaceNovelty};

/// Scores one genome against its inner-loop result and the population.
#[derive(Clone)]
pub struct FitnessEvaluator {
    weights: FitnessWeights,
    novelty: Arc<dyn NoveltyMetric>,
    guard: AlignmentGuard,
}

impl Default for FitnessEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FitnessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitnessEvaluator")
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}

impl FitnessEvaluator {
    pub fn new() -> Self {
        Self {
            weights: FitnessWeights::default(),
            novelty: Arc::new(ObjectiveSpaceNovelty::default()),
            guard: AlignmentGuard::new(),
        }
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_novelty(mut self, novelty: Arc<dyn NoveltyMetric>) -> Self {
        self.novelty = novelty;
        self
    }

    pub fn with_guard(mut self, guard: AlignmentGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    pub fn evaluate(
        &self,
        genome: &GoalGenome,
        result: &InnerLoopResult,
        population: &[GoalGenome],
        patterns: &[AlignmentPattern],
    ) -> FitnessScore {
        let measurements = result.measurements();

        let breakdown: Vec<ObjectiveBreakdown> = genome
            .objectives
            .iter()
            .map(|objective| match measurements.get(&objective.id) {
                Some(m) => ObjectiveBreakdown {
                    objective_id: objective.id.clone(),
                    weight: objective.weight,
                    pass_rate: m.effective_pass_rate(),
                    mean_score: m.mean_score,
                    tasks_run: m.tasks_run,
                    zeroed: m.zeroed,
                },
                None => ObjectiveBreakdown {
                    objective_id: objective.id.clone(),
                    weight: objective.weight,
                    pass_rate: 0.0,
                    mean_score: 0.0,
                    tasks_run: 0,
                    zeroed: false,
                },
            })
            .collect();

        let performance_score = performance(&breakdown);
        let novelty_score = self.novelty.novelty(genome, population).clamp(0.0, 1.0);
        let taste_alignment_score = self.guard.affinity(genome, patterns);
        let aggregate_score =
            self.weights
                .combine(performance_score, novelty_score, taste_alignment_score);
        debug!(
            genome_id = %genome.id.short(),
            performance = performance_score,
            novelty = novelty_score,
            taste = taste_alignment_score,
            aggregate = aggregate_score,
            "Genome scored"
        );

        FitnessScore {
            genome_id: genome.id.clone(),
            performance_score,
            novelty_score,
            taste_alignment_score,
            aggregate_score,
            breakdown,
            critique_score: None,
        }
    }
}

/// Weight-averaged pass rate; a plain mean when every weight is zero.
fn performance(breakdown: &[ObjectiveBreakdown]) -> f64 {
    if breakdown.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = breakdown.iter().map(|b| b.weight).sum();
    let value = if total_weight > 0.0 {
        breakdown.iter().map(|b| b.weight * b.pass_rate).sum::<f64>() / total_weight
    } else {
        breakdown.iter().map(|b| b.pass_rate).sum::<f64>() / breakdown.len() as f64
    };
    value.clamp(0.0, 1.0)
}
