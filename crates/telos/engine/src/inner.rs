//! Inner loop: run one genome's curriculum through the harness.

use std::sync::Arc;
use std::time::Duration;

use telos_curriculum::{CurriculumGenerator, CurriculumRun, LadderCurriculum, RunEvent};
use telos_types::{CurriculumTaskResult, GoalGenome, InnerLoopResult};
use tracing::{debug, instrument, warn};

use crate::harness::ExecutionHarness;

/// Executes curricula task by task under a per-cycle task budget.
///
/// A cycle ends early (and is marked partial) when the budget runs out or
/// the harness fails; results gathered up to that point are kept.
#[derive(Clone)]
pub struct InnerLoop {
    generator: Arc<dyn CurriculumGenerator>,
    harness: Arc<dyn ExecutionHarness>,
    max_tasks: usize,
}

impl InnerLoop {
    pub fn new(harness: Arc<dyn ExecutionHarness>) -> Self {
        Self {
            generator: Arc::new(LadderCurriculum::new()),
            harness,
            max_tasks: 32,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn CurriculumGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    pub fn harness(&self) -> &Arc<dyn ExecutionHarness> {
        &self.harness
    }

    #[instrument(
        skip(self, genome),
        fields(genome_id = %genome.id.short(), harness = self.harness.name())
    )]
    pub async fn run(&self, genome: &GoalGenome) -> InnerLoopResult {
        let curriculum = match self.generator.generate(genome) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Curriculum generation failed");
                let mut result = InnerLoopResult::empty(genome.id.clone());
                result.partial = true;
                result.harness_error = Some(format!("curriculum: {e}"));
                return result;
            }
        };

        let mut run = CurriculumRun::new(curriculum);
        let mut executed = 0usize;
        let mut total_duration = Duration::ZERO;
        let mut partial = false;
        let mut harness_error = None;

        while !run.is_finished() {
            if executed >= self.max_tasks {
                debug!(executed, remaining = run.remaining(), "Task budget exhausted");
                partial = true;
                break;
            }
            let Some(task) = run.next_task() else {
                break;
            };

            let outcome = match self.harness.run_task(&task).await {
                Ok(outcome) => match outcome.check() {
                    Ok(()) => outcome,
                    Err(e) => {
                        warn!(task = %task.id, error = %e, "Harness returned unusable outcome");
                        partial = true;
                        harness_error = Some(e.to_string());
                        break;
                    }
                },
                Err(e) => {
                    warn!(task = %task.id, error = %e, "Harness failure, ending cycle");
                    partial = true;
                    harness_error = Some(e.to_string());
                    break;
                }
            };

            executed += 1;
            total_duration += outcome.duration;
            let event = run.record(
                &task,
                CurriculumTaskResult {
                    task_id: task.id.clone(),
                    objective_id: task.objective_id.clone(),
                    passed: outcome.passed,
                    score: outcome.score,
                    duration: outcome.duration,
                    remedial: false,
                },
            );
            if let RunEvent::ObjectiveZeroed(objective) = event {
                debug!(objective = %objective, "Objective zeroed for this cycle");
            }
        }

        let (task_results, zeroed_objectives) = run.into_parts();
        InnerLoopResult {
            genome_id: genome.id.clone(),
            task_results,
            total_duration,
            iterations_completed: executed,
            partial,
            zeroed_objectives,
            harness_error,
        }
    }
}
