//! Hard-constraint filtering of candidate genomes.

use std::sync::Arc;

use telos_types::{Conflict, GenomeId, GoalGenome};
use tracing::warn;

use crate::comparator::{ConflictComparator, RuleComparator, Stance};
use crate::pattern::AlignmentPattern;

/// Outcome of checking one genome.
#[derive(Clone, Debug, PartialEq)]
pub struct GuardVerdict {
    pub genome_id: GenomeId,
    pub passed: bool,
    /// Empty when `passed`.
    pub conflicts: Vec<Conflict>,
}

/// Candidates split by the guard.
#[derive(Clone, Debug, Default)]
pub struct FilterOutcome {
    pub passed: Vec<GoalGenome>,
    pub rejected: Vec<GuardVerdict>,
}

impl FilterOutcome {
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.rejected.iter().flat_map(|v| v.conflicts.iter())
    }
}

/// Rejects genomes with any objective opposing a high-confidence pattern.
///
/// Neutral and aligned objectives have no effect here; the graded signal
/// lives in [`AlignmentGuard::affinity`].
#[derive(Clone)]
pub struct AlignmentGuard {
    comparator: Arc<dyn ConflictComparator>,
}

impl Default for AlignmentGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AlignmentGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentGuard").finish_non_exhaustive()
    }
}

impl AlignmentGuard {
    pub fn new() -> Self {
        Self {
            comparator: Arc::new(RuleComparator),
        }
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn ConflictComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn check(&self, genome: &GoalGenome, patterns: &[AlignmentPattern]) -> GuardVerdict {
        let mut conflicts = Vec::new();
        for objective in &genome.objectives {
            for pattern in patterns
                .iter()
                .filter(|p| p.active && p.is_high_confidence())
            {
                if let Stance::Opposing { reason } =
                    self.comparator.classify(objective, pattern)
                {
                    conflicts.push(Conflict {
                        genome_id: genome.id.clone(),
                        objective_id: objective.id.clone(),
                        pattern_id: pattern.id.clone(),
                        reason,
                    });
                }
            }
        }
        GuardVerdict {
            genome_id: genome.id.clone(),
            passed: conflicts.is_empty(),
            conflicts,
        }
    }

    /// Keep only passing candidates, logging every conflict.
    pub fn filter_candidates(
        &self,
        candidates: Vec<GoalGenome>,
        patterns: &[AlignmentPattern],
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for candidate in candidates {
            let verdict = self.check(&candidate, patterns);
            if verdict.passed {
                outcome.passed.push(candidate);
                continue;
            }
            for c in &verdict.conflicts {
                warn!(
                    genome_id = %c.genome_id.short(),
                    objective_id = %c.objective_id,
                    pattern_id = %c.pattern_id,
                    reason = %c.reason,
                    "Candidate rejected by alignment guard"
                );
            }
            outcome.rejected.push(verdict);
        }
        outcome
    }

    /// Graded compatibility in [0, 1] over all active patterns.
    ///
    /// Each objective/pattern pair contributes its stance affinity
    /// (aligned 1, neutral 0.5, opposing 0) weighted by objective weight
    /// times pattern confidence. With no weight to spread the result is a
    /// neutral 0.5.
    pub fn affinity(&self, genome: &GoalGenome, patterns: &[AlignmentPattern]) -> f64 {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for objective in &genome.objectives {
            for pattern in patterns.iter().filter(|p| p.active) {
                let w = objective.weight * pattern.success_score;
                weighted += w * self.comparator.classify(objective, pattern).affinity();
                total += w;
            }
        }
        if total > 0.0 {
            (weighted / total).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }
}
