//! Session configuration: budgets, thresholds and tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::scoring::FitnessWeights;

/// Budgets and thresholds for one evolution session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Outer-loop iterations before the session completes
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Accumulated iteration wall time ceiling
    #[serde(default)]
    pub max_compute_time_ms: Option<u64>,

    /// Estimated session memory ceiling
    #[serde(default)]
    pub max_memory_bytes: Option<u64>,

    /// Genomes kept per generation
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    /// A generation with no candidate at or above this is discarded
    #[serde(default = "default_min_fitness_threshold")]
    pub min_fitness_threshold: f64,

    /// Cap on the initial population share drawn from other agents
    #[serde(default = "default_portfolio_seed_percent")]
    pub portfolio_seed_percent: f64,

    #[serde(default = "default_checkpoint_interval_ms")]
    pub checkpoint_interval_ms: u64,

    #[serde(default)]
    pub enable_critique: bool,

    /// Improving past this writes a learning-log entry
    #[serde(default = "default_notable_fitness_threshold")]
    pub notable_fitness_threshold: f64,

    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,

    /// Task budget for one inner-loop cycle
    #[serde(default = "default_inner_loop_max_tasks")]
    pub inner_loop_max_tasks: usize,

    /// Offspring per generation as a multiple of the population size
    #[serde(default = "default_initial_mutation_rate")]
    pub initial_mutation_rate: f64,

    #[serde(default = "default_max_mutation_rate")]
    pub max_mutation_rate: f64,

    #[serde(default = "default_critique_top_n")]
    pub critique_top_n: usize,

    #[serde(default = "default_critique_timeout_ms")]
    pub critique_timeout_ms: u64,

    /// Share of the aggregate score taken by the reviewer mean
    #[serde(default = "default_critique_weight")]
    pub critique_weight: f64,

    /// Genomes held while the store is unreachable
    #[serde(default = "default_store_buffer_capacity")]
    pub store_buffer_capacity: usize,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Fixed seed for reproducible runs
    #[serde(default)]
    pub rng_seed: Option<u64>,

    #[serde(default)]
    pub fitness_weights: FitnessWeights,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_population_size() -> usize {
    20
}

fn default_min_fitness_threshold() -> f64 {
    0.2
}

fn default_portfolio_seed_percent() -> f64 {
    0.2
}

fn default_checkpoint_interval_ms() -> u64 {
    600_000
}

fn default_notable_fitness_threshold() -> f64 {
    0.85
}

fn default_tournament_size() -> usize {
    4
}

fn default_inner_loop_max_tasks() -> usize {
    32
}

fn default_initial_mutation_rate() -> f64 {
    1.0
}

fn default_max_mutation_rate() -> f64 {
    8.0
}

fn default_critique_top_n() -> usize {
    5
}

fn default_critique_timeout_ms() -> u64 {
    30_000
}

fn default_critique_weight() -> f64 {
    0.3
}

fn default_store_buffer_capacity() -> usize {
    256
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_compute_time_ms: None,
            max_memory_bytes: None,
            population_size: default_population_size(),
            min_fitness_threshold: default_min_fitness_threshold(),
            portfolio_seed_percent: default_portfolio_seed_percent(),
            checkpoint_interval_ms: default_checkpoint_interval_ms(),
            enable_critique: false,
            notable_fitness_threshold: default_notable_fitness_threshold(),
            tournament_size: default_tournament_size(),
            inner_loop_max_tasks: default_inner_loop_max_tasks(),
            initial_mutation_rate: default_initial_mutation_rate(),
            max_mutation_rate: default_max_mutation_rate(),
            critique_top_n: default_critique_top_n(),
            critique_timeout_ms: default_critique_timeout_ms(),
            critique_weight: default_critique_weight(),
            store_buffer_capacity: default_store_buffer_capacity(),
            store_timeout_ms: default_store_timeout_ms(),
            rng_seed: None,
            fitness_weights: FitnessWeights::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_max_compute_time_ms(mut self, ms: u64) -> Self {
        self.max_compute_time_ms = Some(ms);
        self
    }

    pub fn with_max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    pub fn with_min_fitness_threshold(mut self, threshold: f64) -> Self {
        self.min_fitness_threshold = threshold;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_critique(mut self, enabled: bool) -> Self {
        self.enable_critique = enabled;
        self
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_interval_ms)
    }

    pub fn critique_timeout(&self) -> Duration {
        Duration::from_millis(self.critique_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Most genomes the initial population may take from other agents.
    pub fn portfolio_seed_limit(&self) -> usize {
        (self.population_size as f64 * self.portfolio_seed_percent).floor() as usize
    }

    pub fn validate(&self) -> ModelResult<()> {
        let fail = |msg: &str| Err(ModelError::InvalidConfig(msg.to_string()));

        if self.max_iterations == 0 {
            return fail("max_iterations must be at least 1");
        }
        if self.population_size == 0 {
            return fail("population_size must be at least 1");
        }
        if self.tournament_size == 0 {
            return fail("tournament_size must be at least 1");
        }
        if self.inner_loop_max_tasks == 0 {
            return fail("inner_loop_max_tasks must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.portfolio_seed_percent) {
            return fail("portfolio_seed_percent must be in [0, 1]");
        }
        if !self.min_fitness_threshold.is_finite() || !self.notable_fitness_threshold.is_finite()
        {
            return fail("fitness thresholds must be finite");
        }
        if !(0.0..=1.0).contains(&self.critique_weight) {
            return fail("critique_weight must be in [0, 1]");
        }
        if self.initial_mutation_rate <= 0.0 || !self.initial_mutation_rate.is_finite() {
            return fail("initial_mutation_rate must be positive");
        }
        if self.max_mutation_rate < self.initial_mutation_rate
            || !self.max_mutation_rate.is_finite()
        {
            return fail("max_mutation_rate must be at least initial_mutation_rate");
        }
        if self.max_memory_bytes == Some(0) {
            return fail("max_memory_bytes must be positive when set");
        }
        self.fitness_weights.validate()
    }
}
