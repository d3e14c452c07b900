//! Curriculum generation from a genome's objectives.

use chrono::Utc;
use telos_types::{Curriculum, CurriculumTask, GoalGenome, TaskId};

use crate::error::CurriculumResult;
use crate::order::order_tasks;

/// Turns a genome's objectives into an ordered task sequence.
pub trait CurriculumGenerator: Send + Sync {
    fn generate(&self, genome: &GoalGenome) -> CurriculumResult<Curriculum>;
}

/// Emits a ladder of increasingly difficult tasks per objective.
///
/// Rung `j` of `n` has difficulty `(j + 1) / n` and depends on rung
/// `j - 1` of the same objective. Ladders are interleaved easiest first.
#[derive(Debug, Clone)]
pub struct LadderCurriculum {
    tasks_per_objective: usize,
}

impl Default for LadderCurriculum {
    fn default() -> Self {
        Self {
            tasks_per_objective: 3,
        }
    }
}

impl LadderCurriculum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks_per_objective(mut self, n: usize) -> Self {
        self.tasks_per_objective = n.max(1);
        self
    }
}

impl CurriculumGenerator for LadderCurriculum {
    fn generate(&self, genome: &GoalGenome) -> CurriculumResult<Curriculum> {
        let n = self.tasks_per_objective;
        let mut tasks = Vec::with_capacity(genome.objectives.len() * n);

        for objective in &genome.objectives {
            let mut previous: Option<TaskId> = None;
            for rung in 0..n {
                let id = TaskId::new(format!("{}:{}:{}", genome.id.short(), objective.id, rung));
                let mut task = CurriculumTask::new(
                    id.clone(),
                    objective.id.clone(),
                    format!("{} (level {} of {})", objective.description, rung + 1, n),
                    (rung + 1) as f64 / n as f64,
                );
                if let Some(prev) = previous.replace(id) {
                    task = task.after(prev);
                }
                tasks.push(task);
            }
        }

        Ok(Curriculum {
            genome_id: genome.id.clone(),
            tasks: order_tasks(tasks)?,
            created_at: Utc::now(),
        })
    }
}
