//! Execution harness boundary.
//!
//! The harness runs one curriculum task against the agent and reports
//! pass/fail, a score and how long it took. The engine is tested with a
//! simulated harness; production plugs in a real one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use telos_types::{CurriculumTask, ObjectiveId};

use crate::error::{HarnessError, HarnessResult};

// ── Task Outcome ────────────────────────────────────────────────────────

/// What the harness observed for one task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskOutcome {
    pub passed: bool,
    /// Score in [0, 1].
    pub score: f64,
    /// Must be non-zero; a zero duration is treated as a harness failure.
    pub duration: Duration,
}

impl TaskOutcome {
    pub fn passed(score: f64, duration: Duration) -> Self {
        Self {
            passed: true,
            score,
            duration,
        }
    }

    pub fn failed(score: f64, duration: Duration) -> Self {
        Self {
            passed: false,
            score,
            duration,
        }
    }

    /// Reject outcomes the inner loop cannot use.
    pub fn check(&self) -> HarnessResult<()> {
        if self.duration.is_zero() {
            return Err(HarnessError::InvalidOutcome(
                "task reported zero duration".into(),
            ));
        }
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(HarnessError::InvalidOutcome(format!(
                "score {} outside [0, 1]",
                self.score
            )));
        }
        Ok(())
    }
}

// ── Harness Trait ───────────────────────────────────────────────────────

/// Runs curriculum tasks against the agent under evolution.
#[async_trait]
pub trait ExecutionHarness: Send + Sync {
    async fn run_task(&self, task: &CurriculumTask) -> HarnessResult<TaskOutcome>;

    /// Name of this harness for logging.
    fn name(&self) -> &str;
}

// ── Simulated Harness ───────────────────────────────────────────────────

/// Deterministic harness for tests and demos.
///
/// Each objective has a skill level in [0, 1]. A task passes when the
/// skill reaches its difficulty; the score is the skill. Objectives listed
/// with [`SimulatedHarness::fail_objective`] always fail, and
/// [`SimulatedHarness::fail_after`] turns every call past the given count
/// into a harness error.
#[derive(Debug)]
pub struct SimulatedHarness {
    default_skill: f64,
    skills: BTreeMap<ObjectiveId, f64>,
    failing: BTreeSet<ObjectiveId>,
    reported_duration: Duration,
    latency: Option<Duration>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl Default for SimulatedHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHarness {
    pub fn new() -> Self {
        Self {
            default_skill: 0.7,
            skills: BTreeMap::new(),
            failing: BTreeSet::new(),
            reported_duration: Duration::from_millis(10),
            latency: None,
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_default_skill(mut self, skill: f64) -> Self {
        self.default_skill = skill.clamp(0.0, 1.0);
        self
    }

    pub fn with_skill(mut self, objective: impl Into<ObjectiveId>, skill: f64) -> Self {
        self.skills.insert(objective.into(), skill.clamp(0.0, 1.0));
        self
    }

    pub fn fail_objective(mut self, objective: impl Into<ObjectiveId>) -> Self {
        self.failing.insert(objective.into());
        self
    }

    /// Duration reported for each task. Zero is allowed so the inner loop's
    /// rejection of it can be exercised.
    pub fn with_reported_duration(mut self, duration: Duration) -> Self {
        self.reported_duration = duration;
        self
    }

    /// Actually wait this long per task.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Return an error for every call after the first `n`.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn skill(&self, objective: &ObjectiveId) -> f64 {
        self.skills
            .get(objective)
            .copied()
            .unwrap_or(self.default_skill)
    }
}

#[async_trait]
impl ExecutionHarness for SimulatedHarness {
    async fn run_task(&self, task: &CurriculumTask) -> HarnessResult<TaskOutcome> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if call >= limit {
                return Err(HarnessError::Failed(format!(
                    "simulated failure on task '{}'",
                    task.id
                )));
            }
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.contains(&task.objective_id) {
            return Ok(TaskOutcome::failed(0.0, self.reported_duration));
        }
        let skill = self.skill(&task.objective_id);
        let outcome = if skill >= task.difficulty {
            TaskOutcome::passed(skill, self.reported_duration)
        } else {
            TaskOutcome::failed(skill, self.reported_duration)
        };
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "simulated-harness"
    }
}

// ── Failing Harness ─────────────────────────────────────────────────────

/// Harness whose every call fails.
#[derive(Debug, Default)]
pub struct FailingHarness;

#[async_trait]
impl ExecutionHarness for FailingHarness {
    async fn run_task(&self, task: &CurriculumTask) -> HarnessResult<TaskOutcome> {
        Err(HarnessError::Unavailable(format!(
            "no harness for task '{}'",
            task.id
        )))
    }

    fn name(&self) -> &str {
        "failing-harness"
    }
}
