//! Execution-side state of a curriculum: result ingestion and remediation.
//!
//! A failed task is followed immediately by one remedial task for the same
//! objective at the same difficulty. If that remedial also fails the
//! objective is zeroed for the cycle and the run moves on. Remedials are
//! never remediated.

use std::collections::{BTreeSet, VecDeque};

use telos_types::{Curriculum, CurriculumTask, CurriculumTaskResult, ObjectiveId, TaskId};
use tracing::debug;

/// What ingesting a result changed.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Passed,
    RemedialScheduled(TaskId),
    ObjectiveZeroed(ObjectiveId),
}

#[derive(Debug, Clone)]
pub struct CurriculumRun {
    queue: VecDeque<CurriculumTask>,
    results: Vec<CurriculumTaskResult>,
    zeroed: BTreeSet<ObjectiveId>,
}

impl CurriculumRun {
    pub fn new(curriculum: Curriculum) -> Self {
        Self {
            queue: curriculum.tasks.into(),
            results: Vec::new(),
            zeroed: BTreeSet::new(),
        }
    }

    /// Take the next task to execute.
    pub fn next_task(&mut self) -> Option<CurriculumTask> {
        self.queue.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn results(&self) -> &[CurriculumTaskResult] {
        &self.results
    }

    pub fn zeroed_objectives(&self) -> &BTreeSet<ObjectiveId> {
        &self.zeroed
    }

    /// Ingest the outcome of `task`, which came from [`CurriculumRun::next_task`].
    pub fn record(&mut self, task: &CurriculumTask, mut result: CurriculumTaskResult) -> RunEvent {
        result.remedial = task.is_remedial();
        let passed = result.passed;
        self.results.push(result);

        if passed {
            return RunEvent::Passed;
        }

        match &task.remedial_for {
            None => {
                let remedial = remedial_for(task);
                let id = remedial.id.clone();
                debug!(task = %task.id, remedial = %id, "Scheduling remedial task");
                self.queue.push_front(remedial);
                RunEvent::RemedialScheduled(id)
            }
            Some(original) => {
                debug!(
                    task = %original,
                    objective = %task.objective_id,
                    "Remedial task failed, zeroing objective"
                );
                self.zeroed.insert(task.objective_id.clone());
                RunEvent::ObjectiveZeroed(task.objective_id.clone())
            }
        }
    }

    pub fn into_parts(self) -> (Vec<CurriculumTaskResult>, BTreeSet<ObjectiveId>) {
        (self.results, self.zeroed)
    }
}

fn remedial_for(failed: &CurriculumTask) -> CurriculumTask {
    CurriculumTask {
        id: TaskId::new(format!("{}:remedial", failed.id)),
        objective_id: failed.objective_id.clone(),
        description: format!("remedial: {}", failed.description),
        difficulty: failed.difficulty,
        predecessor_ids: vec![failed.id.clone()],
        remedial_for: Some(failed.id.clone()),
    }
}
