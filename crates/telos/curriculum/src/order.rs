//! Total ordering of curriculum tasks.
//!
//! A valid order satisfies two constraints at once: every predecessor of a
//! task appears before it, and difficulty never decreases along the
//! sequence.

use std::collections::{HashMap, HashSet};

use telos_types::{CurriculumTask, TaskId};

use crate::error::{CurriculumError, CurriculumResult};

/// Order `tasks` topologically, always taking the easiest ready task.
///
/// Ties on difficulty keep the input order. Fails on unknown
/// predecessors, cycles, or dependencies that force a harder task before
/// an easier one.
pub fn order_tasks(tasks: Vec<CurriculumTask>) -> CurriculumResult<Vec<CurriculumTask>> {
    let mut index: HashMap<TaskId, usize> = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        if !task.difficulty.is_finite() {
            return Err(CurriculumError::Invalid(format!(
                "task {} has non-finite difficulty",
                task.id
            )));
        }
        if index.insert(task.id.clone(), i).is_some() {
            return Err(CurriculumError::DuplicateTask(task.id.clone()));
        }
    }

    let mut pending = vec![0usize; tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    for (i, task) in tasks.iter().enumerate() {
        let mut seen = HashSet::new();
        for predecessor in &task.predecessor_ids {
            let &p = index
                .get(predecessor)
                .ok_or_else(|| CurriculumError::UnknownPredecessor {
                    task: task.id.clone(),
                    predecessor: predecessor.clone(),
                })?;
            if seen.insert(p) {
                pending[i] += 1;
                dependents[p].push(i);
            }
        }
    }

    let mut ready: Vec<usize> = (0..tasks.len()).filter(|i| pending[*i] == 0).collect();
    let mut order: Vec<usize> = Vec::with_capacity(tasks.len());

    while !ready.is_empty() {
        let (slot, _) = ready
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                tasks[**a]
                    .difficulty
                    .total_cmp(&tasks[**b].difficulty)
                    .then(a.cmp(b))
            })
            .ok_or_else(|| CurriculumError::Invalid("empty ready set".into()))?;
        let next = ready.swap_remove(slot);
        order.push(next);
        for &d in &dependents[next] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.push(d);
            }
        }
    }

    if order.len() < tasks.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        let stuck = (0..tasks.len())
            .filter(|i| !placed.contains(i))
            .map(|i| tasks[i].id.clone())
            .collect();
        return Err(CurriculumError::Cycle(stuck));
    }

    let mut slots: Vec<Option<CurriculumTask>> = tasks.into_iter().map(Some).collect();
    let ordered: Vec<CurriculumTask> = order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect();
    validate_order(&ordered)?;
    Ok(ordered)
}

/// Check both ordering constraints on an already ordered sequence.
pub fn validate_order(tasks: &[CurriculumTask]) -> CurriculumResult<()> {
    let mut seen: HashSet<&TaskId> = HashSet::with_capacity(tasks.len());
    let all: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
    let mut previous: Option<f64> = None;

    for task in tasks {
        for predecessor in &task.predecessor_ids {
            if !all.contains(predecessor) {
                return Err(CurriculumError::UnknownPredecessor {
                    task: task.id.clone(),
                    predecessor: predecessor.clone(),
                });
            }
            if !seen.contains(predecessor) {
                return Err(CurriculumError::PredecessorOutOfOrder {
                    task: task.id.clone(),
                    predecessor: predecessor.clone(),
                });
            }
        }
        if let Some(prev) = previous {
            if task.difficulty < prev {
                return Err(CurriculumError::NonMonotonic {
                    task: task.id.clone(),
                    difficulty: task.difficulty,
                    previous: prev,
                });
            }
        }
        if !seen.insert(&task.id) {
            return Err(CurriculumError::DuplicateTask(task.id.clone()));
        }
        previous = Some(task.difficulty);
    }
    Ok(())
}
