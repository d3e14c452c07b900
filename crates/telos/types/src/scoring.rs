//! Fitness scores and the weights that combine them.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::ids::{GenomeId, ObjectiveId};

fn default_performance_weight() -> f64 {
    0.6
}

fn default_novelty_weight() -> f64 {
    0.2
}

fn default_taste_weight() -> f64 {
    0.2
}

/// Relative weights of the three fitness signals.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    #[serde(default = "default_performance_weight")]
    pub performance: f64,
    #[serde(default = "default_novelty_weight")]
    pub novelty: f64,
    #[serde(default = "default_taste_weight")]
    pub taste_alignment: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            performance: default_performance_weight(),
            novelty: default_novelty_weight(),
            taste_alignment: default_taste_weight(),
        }
    }
}

impl FitnessWeights {
    pub fn validate(&self) -> ModelResult<()> {
        let all = [self.performance, self.novelty, self.taste_alignment];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ModelError::InvalidConfig(
                "fitness weights must be finite and non-negative".into(),
            ));
        }
        if all.iter().sum::<f64>() <= 0.0 {
            return Err(ModelError::InvalidConfig(
                "fitness weights must not all be zero".into(),
            ));
        }
        Ok(())
    }

    /// Weighted sum of the three signals, normalised by the total weight
    /// so the result stays in [0, 1].
    pub fn combine(&self, performance: f64, novelty: f64, taste_alignment: f64) -> f64 {
        let total = self.performance + self.novelty + self.taste_alignment;
        if total <= 0.0 {
            return 0.0;
        }
        let sum = self.performance * performance
            + self.novelty * novelty
            + self.taste_alignment * taste_alignment;
        (sum / total).clamp(0.0, 1.0)
    }
}

/// Per-objective slice of a fitness score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    pub objective_id: ObjectiveId,
    pub weight: f64,
    /// Pass rate actually credited (0 when zeroed).
    pub pass_rate: f64,
    pub mean_score: f64,
    pub tasks_run: usize,
    /// Scored zero after a failed remedial task.
    pub zeroed: bool,
}

/// Ranked fitness of one genome within one generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitnessScore {
    pub genome_id: GenomeId,
    pub performance_score: f64,
    pub novelty_score: f64,
    pub taste_alignment_score: f64,
    pub aggregate_score: f64,
    pub breakdown: Vec<ObjectiveBreakdown>,
    /// Mean reviewer score when the critique step ran for this genome.
    #[serde(default)]
    pub critique_score: Option<f64>,
}

impl FitnessScore {
    /// Blend a reviewer score into the aggregate.
    pub fn with_critique(mut self, critique: f64, weight: f64) -> Self {
        let critique = critique.clamp(0.0, 1.0);
        let weight = weight.clamp(0.0, 1.0);
        self.aggregate_score = (1.0 - weight) * self.aggregate_score + weight * critique;
        self.critique_score = Some(critique);
        self
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.aggregate_score >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(aggregate: f64) -> FitnessScore {
        FitnessScore {
            genome_id: GenomeId::new("g"),
            performance_score: aggregate,
            novelty_score: 0.0,
            taste_alignment_score: 0.0,
            aggregate_score: aggregate,
            breakdown: vec![],
            critique_score: None,
        }
    }

    #[test]
    fn default_weights() {
        let w = FitnessWeights::default();
        assert_eq!(w.performance, 0.6);
        assert_eq!(w.novelty, 0.2);
        assert_eq!(w.taste_alignment, 0.2);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn combine_is_weighted_mean() {
        let w = FitnessWeights::default();
        let v = w.combine(1.0, 0.5, 0.0);
        assert!((v - 0.7).abs() < 1e-12);
    }

    #[test]
    fn negative_weight_rejected() {
        let w = FitnessWeights {
            performance: -0.1,
            ..Default::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn zero_weights_rejected() {
        let w = FitnessWeights {
            performance: 0.0,
            novelty: 0.0,
            taste_alignment: 0.0,
        };
        assert!(w.validate().is_err());
        assert_eq!(w.combine(1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn critique_blend() {
        let s = score(0.5).with_critique(1.0, 0.3);
        assert!((s.aggregate_score - 0.65).abs() < 1e-12);
        assert_eq!(s.critique_score, Some(1.0));
        assert!(s.meets(0.6));
    }
}
