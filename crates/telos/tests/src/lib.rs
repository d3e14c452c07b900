//! Shared fixtures for the end-to-end and property suites.

use std::sync::Arc;

use telos_engine::SimulatedHarness;
use telos_session::SessionManager;
use telos_store::InMemoryGenomeStore;
use telos_types::{FitnessScore, GenomeId, GoalGenome, ObjectiveDescriptor, SessionConfig};

pub const AGENT: &str = "agent-under-test";

/// A seed genome built from `(id, domain, weight)` triples.
pub fn seed(objectives: &[(&str, &str, f64)]) -> GoalGenome {
    let objectives = objectives
        .iter()
        .map(|(id, domain, weight)| {
            ObjectiveDescriptor::new(*id, format!("pursue {id}"), *domain, *weight)
        })
        .collect();
    GoalGenome::seed(AGENT, objectives).expect("fixture objectives are valid")
}

/// `n` distinct seeds sharing one engineering objective.
pub fn seeds(n: usize) -> Vec<GoalGenome> {
    (0..n)
        .map(|i| {
            GoalGenome::seed(
                AGENT,
                vec![ObjectiveDescriptor::new("code", "write code", "engineering", 0.7)
                    .with_parameter("strictness", 0.05 * i as f64)],
            )
            .expect("fixture objectives are valid")
        })
        .collect()
}

/// Small, fast, reproducible session settings.
pub fn quick_config() -> SessionConfig {
    SessionConfig::new()
        .with_population_size(4)
        .with_max_iterations(3)
        .with_min_fitness_threshold(0.1)
        .with_rng_seed(7)
}

/// Manager over an in-memory store and a harness that passes everything.
pub fn manager(store: Arc<InMemoryGenomeStore>) -> SessionManager {
    SessionManager::new(store, Arc::new(SimulatedHarness::new().with_default_skill(1.0)))
}

/// A score whose signals all equal `aggregate`.
pub fn flat_score(genome_id: GenomeId, aggregate: f64) -> FitnessScore {
    FitnessScore {
        genome_id,
        performance_score: aggregate,
        novelty_score: aggregate,
        taste_alignment_score: aggregate,
        aggregate_score: aggregate,
        breakdown: Vec::new(),
        critique_score: None,
    }
}
