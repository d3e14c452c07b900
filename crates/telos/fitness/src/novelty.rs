//! Population novelty.

use std::collections::{BTreeMap, BTreeSet};

use telos_types::GoalGenome;

/// Pluggable novelty strategy.
///
/// Returns a value in [0, 1]: 0 when `genome` is indistinguishable from
/// the population, 1 when maximally distinct.
pub trait NoveltyMetric: Send + Sync {
    fn novelty(&self, genome: &GoalGenome, population: &[GoalGenome]) -> f64;
}

/// Mean distance to the `k` nearest population members in objective space.
///
/// Distance between two genomes averages the Jaccard distance of their
/// domain sets and the mean relative difference of their parameters,
/// keyed by `(objective id, parameter)`. The genome itself (same id) is
/// excluded from the comparison set.
#[derive(Debug, Clone)]
pub struct ObjectiveSpaceNovelty {
    k: usize,
}

impl Default for ObjectiveSpaceNovelty {
    fn default() -> Self {
        Self { k: 3 }
    }
}

impl ObjectiveSpaceNovelty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    pub fn distance(a: &GoalGenome, b: &GoalGenome) -> f64 {
        (domain_distance(a, b) + parameter_distance(a, b)) / 2.0
    }
}

impl NoveltyMetric for ObjectiveSpaceNovelty {
    fn novelty(&self, genome: &GoalGenome, population: &[GoalGenome]) -> f64 {
        let mut distances: Vec<f64> = population
            .iter()
            .filter(|other| other.id != genome.id)
            .map(|other| Self::distance(genome, other))
            .collect();
        if distances.is_empty() {
            return 1.0;
        }
        distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let nearest = &distances[..self.k.min(distances.len())];
        (nearest.iter().sum::<f64>() / nearest.len() as f64).clamp(0.0, 1.0)
    }
}

fn domain_distance(a: &GoalGenome, b: &GoalGenome) -> f64 {
    let da: BTreeSet<String> = a.objectives.iter().map(|o| o.domain.to_lowercase()).collect();
    let db: BTreeSet<String> = b.objectives.iter().map(|o| o.domain.to_lowercase()).collect();
    let union = da.union(&db).count();
    if union == 0 {
        return 0.0;
    }
    1.0 - da.intersection(&db).count() as f64 / union as f64
}

fn parameter_vector(g: &GoalGenome) -> BTreeMap<(String, String), f64> {
    g.objectives
        .iter()
        .flat_map(|o| {
            o.parameters
                .iter()
                .map(move |(k, v)| ((o.id.as_str().to_string(), k.clone()), *v))
        })
        .collect()
}

fn parameter_distance(a: &GoalGenome, b: &GoalGenome) -> f64 {
    let va = parameter_vector(a);
    let vb = parameter_vector(b);
    let keys: BTreeSet<&(String, String)> = va.keys().chain(vb.keys()).collect();
    if keys.is_empty() {
        return 0.0;
    }
    let total: f64 = keys
        .iter()
        .map(|key| match (va.get(*key), vb.get(*key)) {
            (Some(x), Some(y)) => {
                let scale = x.abs() + y.abs();
                if scale == 0.0 {
                    0.0
                } else {
                    ((x - y).abs() / scale).min(1.0)
                }
            }
            _ => 1.0,
        })
        .sum();
    total / keys.len() as f64
}
