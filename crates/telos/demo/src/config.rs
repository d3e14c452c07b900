//! Configuration for the demo binary.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telos_engine::{CritiqueCollaborator, NoopCritique, ScriptedCritique, SimulatedHarness};
use telos_guard::AlignmentPattern;
use telos_types::{GoalGenome, ModelResult, ObjectiveDescriptor, SessionConfig};

/// Top-level demo configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub harness: HarnessConfig,

    #[serde(default)]
    pub critique: CritiqueConfig,

    /// Alignment patterns loaded into the shared pattern book.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<AlignmentPattern>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            session: SessionConfig::default(),
            harness: HarnessConfig::default(),
            critique: CritiqueConfig::default(),
            patterns: default_patterns(),
        }
    }
}

/// Agent under evolution and its seed genomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// One entry per seed genome, each a list of objectives.
    #[serde(default = "default_seeds")]
    pub seeds: Vec<Vec<ObjectiveDescriptor>>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            seeds: default_seeds(),
        }
    }
}

impl AgentConfig {
    pub fn seed_genomes(&self) -> ModelResult<Vec<GoalGenome>> {
        self.seeds
            .iter()
            .map(|objectives| GoalGenome::seed(self.name.clone(), objectives.clone()))
            .collect()
    }
}

/// Simulated execution harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Skill used for objectives without an explicit entry.
    #[serde(default = "default_skill")]
    pub default_skill: f64,

    /// Per-objective skill in [0, 1].
    #[serde(default)]
    pub skills: BTreeMap<String, f64>,

    /// Real delay per task in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_skill: default_skill(),
            skills: BTreeMap::new(),
            latency_ms: 0,
        }
    }
}

impl HarnessConfig {
    pub fn build(&self) -> SimulatedHarness {
        let mut harness = SimulatedHarness::new().with_default_skill(self.default_skill);
        for (objective, skill) in &self.skills {
            harness = harness.with_skill(objective.as_str(), *skill);
        }
        if self.latency_ms > 0 {
            harness = harness.with_latency(Duration::from_millis(self.latency_ms));
        }
        harness
    }
}

/// Scripted critique panel, used when the session enables critique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CritiqueConfig {
    #[serde(default)]
    pub reviewers: Vec<String>,

    /// Domains every reviewer rejects.
    #[serde(default)]
    pub rejected_domains: Vec<String>,

    /// Score reviewers give candidates they do not reject.
    #[serde(default)]
    pub score: Option<f64>,
}

impl CritiqueConfig {
    pub fn build(&self) -> Arc<dyn CritiqueCollaborator> {
        if self.reviewers.is_empty() {
            return Arc::new(NoopCritique);
        }
        let mut panel = ScriptedCritique::new(self.reviewers.clone());
        if let Some(score) = self.score {
            panel = panel.with_score(score);
        }
        for domain in &self.rejected_domains {
            panel = panel.reject_domain(domain.clone());
        }
        Arc::new(panel)
    }
}

// Default value helpers
fn default_agent_name() -> String {
    "demo-agent".to_string()
}

fn default_skill() -> f64 {
    0.75
}

fn default_seeds() -> Vec<Vec<ObjectiveDescriptor>> {
    vec![
        vec![
            ObjectiveDescriptor::new("correctness", "Produce correct answers", "quality", 0.7)
                .with_parameter("strictness", 0.5),
            ObjectiveDescriptor::new("brevity", "Keep answers short", "style", 0.3)
                .with_parameter("max_words", 200.0),
        ],
        vec![
            ObjectiveDescriptor::new("coverage", "Cover edge cases", "quality", 0.6)
                .with_parameter("depth", 2.0),
            ObjectiveDescriptor::new("speed", "Answer quickly", "latency", 0.4),
        ],
    ]
}

fn default_patterns() -> Vec<AlignmentPattern> {
    vec![AlignmentPattern::new(
        "no-shortcuts",
        "Never optimise by skipping the actual work",
        0.9,
    )
    .flag_domain("shortcut-seeking")]
}

impl DemoConfig {
    /// Defaults, then the optional file, then `TELOS_*` environment
    /// variables (nested keys use `__`, e.g. `TELOS_SESSION__MAX_ITERATIONS`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DemoConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TELOS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
