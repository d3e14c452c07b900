//! Curriculum tasks, task results and inner-loop summaries.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GenomeId, ObjectiveId, TaskId};

/// One unit of work for the execution harness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurriculumTask {
    pub id: TaskId,
    pub objective_id: ObjectiveId,
    pub description: String,
    /// Non-decreasing along a valid task order.
    pub difficulty: f64,
    /// Tasks that must appear earlier in the order.
    #[serde(default)]
    pub predecessor_ids: Vec<TaskId>,
    /// Set when this task was generated to remediate a failure.
    #[serde(default)]
    pub remedial_for: Option<TaskId>,
}

impl CurriculumTask {
    pub fn new(
        id: impl Into<TaskId>,
        objective_id: impl Into<ObjectiveId>,
        description: impl Into<String>,
        difficulty: f64,
    ) -> Self {
        Self {
            id: id.into(),
            objective_id: objective_id.into(),
            description: description.into(),
            difficulty,
            predecessor_ids: Vec::new(),
            remedial_for: None,
        }
    }

    pub fn after(mut self, predecessor: impl Into<TaskId>) -> Self {
        self.predecessor_ids.push(predecessor.into());
        self
    }

    pub fn is_remedial(&self) -> bool {
        self.remedial_for.is_some()
    }
}

/// Ordered task sequence generated for one genome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub genome_id: GenomeId,
    pub tasks: Vec<CurriculumTask>,
    pub created_at: DateTime<Utc>,
}

impl Curriculum {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Outcome of one task as reported by the harness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurriculumTaskResult {
    pub task_id: TaskId,
    pub objective_id: ObjectiveId,
    pub passed: bool,
    pub score: f64,
    /// Always positive.
    pub duration: Duration,
    #[serde(default)]
    pub remedial: bool,
}

/// Per-objective summary of one inner-loop cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveMeasurement {
    pub pass_rate: f64,
    pub mean_score: f64,
    pub tasks_run: usize,
    pub zeroed: bool,
}

impl ObjectiveMeasurement {
    /// Pass rate credited to the objective; zeroed objectives score 0.
    pub fn effective_pass_rate(&self) -> f64 {
        if self.zeroed {
            0.0
        } else {
            self.pass_rate
        }
    }
}

/// Result of driving one genome through its curriculum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InnerLoopResult {
    pub genome_id: GenomeId,
    pub task_results: Vec<CurriculumTaskResult>,
    pub total_duration: Duration,
    pub iterations_completed: usize,
    /// Budget exhausted or harness failed before natural completion.
    pub partial: bool,
    /// Objectives whose remedial task also failed.
    #[serde(default)]
    pub zeroed_objectives: BTreeSet<ObjectiveId>,
    /// Harness failure message when the cycle was cut short by it.
    #[serde(default)]
    pub harness_error: Option<String>,
}

impl InnerLoopResult {
    pub fn empty(genome_id: GenomeId) -> Self {
        Self {
            genome_id,
            task_results: Vec::new(),
            total_duration: Duration::ZERO,
            iterations_completed: 0,
            partial: false,
            zeroed_objectives: BTreeSet::new(),
            harness_error: None,
        }
    }

    /// Aggregate task results per objective.
    pub fn measurements(&self) -> BTreeMap<ObjectiveId, ObjectiveMeasurement> {
        let mut acc: BTreeMap<ObjectiveId, (usize, usize, f64)> = BTreeMap::new();
        for r in &self.task_results {
            let entry = acc.entry(r.objective_id.clone()).or_insert((0, 0, 0.0));
            entry.0 += 1;
            if r.passed {
                entry.1 += 1;
            }
            entry.2 += r.score;
        }

        let mut out: BTreeMap<ObjectiveId, ObjectiveMeasurement> = acc
            .into_iter()
            .map(|(id, (run, passed, score_sum))| {
                let zeroed = self.zeroed_objectives.contains(&id);
                let m = ObjectiveMeasurement {
                    pass_rate: passed as f64 / run as f64,
                    mean_score: score_sum / run as f64,
                    tasks_run: run,
                    zeroed,
                };
                (id, m)
            })
            .collect();

        for id in &self.zeroed_objectives {
            out.entry(id.clone()).or_insert(ObjectiveMeasurement {
                pass_rate: 0.0,
                mean_score: 0.0,
                tasks_run: 0,
                zeroed: true,
            });
        }
        out
    }
}
