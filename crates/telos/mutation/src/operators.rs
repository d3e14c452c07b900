//! The four mutation operators.
//!
//! Each operator takes its parent(s) by reference and derives a new child
//! genome; parents are never edited. Every child passes [`seal`] before it
//! is returned, so a child that breaks the lineage arithmetic or the
//! objective invariants never leaves this module.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use telos_types::{FitnessCriterion, GoalGenome, ObjectiveDescriptor, ObjectiveId};

use crate::error::{MutationError, MutationResult};
use crate::types::MutationType;

/// Metadata key naming the operator that produced a genome.
pub const MUTATION_KEY: &str = "mutation";

/// Metadata key recording the second parent of a recombined genome.
pub const SECONDARY_PARENT_KEY: &str = "secondary_parent_id";

// ── Add ─────────────────────────────────────────────────────────────

/// Append `objective` to a copy of `genome`.
pub fn add_objective(
    genome: &GoalGenome,
    objective: ObjectiveDescriptor,
) -> MutationResult<GoalGenome> {
    if genome.has_objective(&objective.id) {
        return Err(MutationError::DuplicateObjectiveId(objective.id));
    }
    check_objective(&objective)?;

    let mut criteria = genome.fitness_criteria.clone();
    criteria.push(FitnessCriterion::pass_rate(objective.id.clone()));
    let mut objectives = genome.objectives.clone();
    objectives.push(objective);

    let child = genome
        .derive_child(objectives, criteria)?
        .with_metadata(MUTATION_KEY, MutationType::Add.as_str());
    seal(child, genome)
}

// ── Remove ──────────────────────────────────────────────────────────

/// Drop `objective_id` and its criteria from a copy of `genome`.
pub fn remove_objective(
    genome: &GoalGenome,
    objective_id: &ObjectiveId,
) -> MutationResult<GoalGenome> {
    if !genome.has_objective(objective_id) {
        return Err(MutationError::ObjectiveNotFound(objective_id.clone()));
    }
    if genome.objectives.len() == 1 {
        return Err(MutationError::LastObjectiveViolation(genome.id.clone()));
    }

    let objectives = genome
        .objectives
        .iter()
        .filter(|o| &o.id != objective_id)
        .cloned()
        .collect();
    let criteria = genome
        .fitness_criteria
        .iter()
        .filter(|c| &c.objective_id != objective_id)
        .cloned()
        .collect();

    let child = genome
        .derive_child(objectives, criteria)?
        .with_metadata(MUTATION_KEY, MutationType::Remove.as_str());
    seal(child, genome)
}

// ── Perturb ─────────────────────────────────────────────────────────

/// Add `delta` to the parameters of one objective.
///
/// A key absent from the objective starts at 0. At least one parameter
/// must end up different from its original value.
pub fn perturb_objective(
    genome: &GoalGenome,
    objective_id: &ObjectiveId,
    delta: &BTreeMap<String, f64>,
) -> MutationResult<GoalGenome> {
    let original = genome
        .objective(objective_id)
        .ok_or_else(|| MutationError::ObjectiveNotFound(objective_id.clone()))?;

    let mut perturbed = original.clone();
    let mut changed = false;
    for (key, d) in delta {
        let before = original.parameter(key);
        let after = before.unwrap_or(0.0) + d;
        if !after.is_finite() {
            return Err(MutationError::InvalidObjective(format!(
                "parameter {key} of {objective_id} would become {after}"
            )));
        }
        changed |= before != Some(after);
        perturbed.parameters.insert(key.clone(), after);
    }
    if !changed {
        return Err(MutationError::NoEffectivePerturbation(objective_id.clone()));
    }

    let objectives = genome
        .objectives
        .iter()
        .map(|o| {
            if &o.id == objective_id {
                perturbed.clone()
            } else {
                o.clone()
            }
        })
        .collect();

    let child = genome
        .derive_child(objectives, genome.fitness_criteria.clone())?
        .with_metadata(MUTATION_KEY, MutationType::Perturb.as_str());
    seal(child, genome)
}

// ── Recombine ───────────────────────────────────────────────────────

/// Union of both parents' objectives, unique by id.
///
/// On an id collision the higher-weight objective wins; ties keep
/// `parent_a`'s. Each entry carries the criteria of the parent it came from.
fn objective_union(
    parent_a: &GoalGenome,
    parent_b: &GoalGenome,
) -> Vec<(ObjectiveDescriptor, Vec<FitnessCriterion>)> {
    let criteria_of = |genome: &GoalGenome, id: &ObjectiveId| -> Vec<FitnessCriterion> {
        genome
            .fitness_criteria
            .iter()
            .filter(|c| &c.objective_id == id)
            .cloned()
            .collect()
    };

    let mut union: Vec<(ObjectiveDescriptor, Vec<FitnessCriterion>)> = parent_a
        .objectives
        .iter()
        .map(|o| (o.clone(), criteria_of(parent_a, &o.id)))
        .collect();

    for candidate in &parent_b.objectives {
        match union.iter_mut().find(|(o, _)| o.id == candidate.id) {
            Some(slot) if candidate.weight > slot.0.weight => {
                *slot = (candidate.clone(), criteria_of(parent_b, &candidate.id));
            }
            Some(_) => {}
            None => union.push((candidate.clone(), criteria_of(parent_b, &candidate.id))),
        }
    }
    union
}

/// Recombine two parents, keeping the named union members.
pub fn recombine_keeping(
    parent_a: &GoalGenome,
    parent_b: &GoalGenome,
    keep: &[ObjectiveId],
) -> MutationResult<GoalGenome> {
    if parent_a.id == parent_b.id {
        return Err(MutationError::MissingPartner(parent_a.id.clone()));
    }
    if keep.is_empty() {
        return Err(MutationError::InvalidObjective(
            "recombination must keep at least one objective".into(),
        ));
    }

    let union = objective_union(parent_a, parent_b);
    if let Some(missing) = keep.iter().find(|id| !union.iter().any(|(o, _)| &o.id == *id)) {
        return Err(MutationError::ObjectiveNotFound((*missing).clone()));
    }

    let mut objectives = Vec::new();
    let mut criteria = Vec::new();
    for (objective, mut objective_criteria) in union {
        if !keep.contains(&objective.id) {
            continue;
        }
        if objective_criteria.is_empty() {
            objective_criteria.push(FitnessCriterion::pass_rate(objective.id.clone()));
        }
        criteria.extend(objective_criteria);
        objectives.push(objective);
    }

    let child = parent_a
        .derive_child(objectives, criteria)?
        .with_metadata(MUTATION_KEY, MutationType::Recombine.as_str())
        .with_metadata(SECONDARY_PARENT_KEY, parent_b.id.as_str());
    seal(child, parent_a)
}

/// Recombine two parents, keeping a random non-empty subset of the union.
pub fn recombine<R: Rng + ?Sized>(
    parent_a: &GoalGenome,
    parent_b: &GoalGenome,
    rng: &mut R,
) -> MutationResult<GoalGenome> {
    if parent_a.id == parent_b.id {
        return Err(MutationError::MissingPartner(parent_a.id.clone()));
    }
    let union_ids: Vec<ObjectiveId> = objective_union(parent_a, parent_b)
        .into_iter()
        .map(|(o, _)| o.id)
        .collect();

    let mut keep: Vec<ObjectiveId> = union_ids
        .iter()
        .filter(|_| rng.gen_bool(0.5))
        .cloned()
        .collect();
    if keep.is_empty() {
        if let Some(id) = union_ids.choose(rng) {
            keep.push(id.clone());
        }
    }
    recombine_keeping(parent_a, parent_b, &keep)
}

// ── Contract ────────────────────────────────────────────────────────

fn check_objective(objective: &ObjectiveDescriptor) -> MutationResult<()> {
    if objective.id.as_str().is_empty() {
        return Err(MutationError::InvalidObjective("empty objective id".into()));
    }
    if !objective.weight.is_finite() || !(0.0..=1.0).contains(&objective.weight) {
        return Err(MutationError::InvalidObjective(format!(
            "objective {} weight {} outside [0, 1]",
            objective.id, objective.weight
        )));
    }
    if objective.parameters.values().any(|v| !v.is_finite()) {
        return Err(MutationError::InvalidObjective(format!(
            "objective {} has non-finite parameters",
            objective.id
        )));
    }
    Ok(())
}

/// Reject a child that does not satisfy the invariant set relative to
/// `parent`. Nothing is corrected here.
pub(crate) fn seal(child: GoalGenome, parent: &GoalGenome) -> MutationResult<GoalGenome> {
    child
        .validate_child_of(parent)
        .map_err(|e| MutationError::InvariantViolation(e.to_string()))?;
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn seed() -> GoalGenome {
        GoalGenome::seed(
            "agent",
            vec![
                ObjectiveDescriptor::new("obj-1", "first", "correctness", 0.7)
                    .with_parameter("strictness", 0.5),
                ObjectiveDescriptor::new("obj-2", "second", "style", 0.3),
            ],
        )
        .unwrap()
    }

    fn other() -> GoalGenome {
        GoalGenome::seed(
            "agent",
            vec![
                ObjectiveDescriptor::new("obj-2", "heavier second", "style", 0.9),
                ObjectiveDescriptor::new("obj-3", "third", "latency", 0.4),
            ],
        )
        .unwrap()
    }

    fn assert_child_of(child: &GoalGenome, parent: &GoalGenome) {
        assert_eq!(child.generation, parent.generation + 1);
        assert_eq!(child.parent_id.as_ref(), Some(&parent.id));
        assert!(!child.objectives.is_empty());
        let ids: HashSet<_> = child.objectives.iter().map(|o| &o.id).collect();
        assert_eq!(ids.len(), child.objectives.len());
    }

    #[test]
    fn add_appends_objective() {
        let parent = seed();
        let child = add_objective(
            &parent,
            ObjectiveDescriptor::new("obj-new", "new", "safety", 0.5),
        )
        .unwrap();
        assert_child_of(&child, &parent);
        assert_eq!(child.objectives.len(), 3);
        assert!(child.has_objective(&ObjectiveId::new("obj-new")));
        assert_eq!(child.metadata.get(MUTATION_KEY).unwrap(), "add");
        assert_eq!(parent.objectives.len(), 2);
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let parent = seed();
        let err = add_objective(
            &parent,
            ObjectiveDescriptor::new("obj-1", "clash", "x", 0.5),
        )
        .unwrap_err();
        assert!(matches!(err, MutationError::DuplicateObjectiveId(_)));
    }

    #[test]
    fn add_rejects_bad_weight() {
        let parent = seed();
        let mut o = ObjectiveDescriptor::new("obj-x", "x", "x", 0.5);
        o.weight = 2.0;
        assert!(matches!(
            add_objective(&parent, o),
            Err(MutationError::InvalidObjective(_))
        ));
    }

    #[test]
    fn remove_drops_objective_and_criteria() {
        let parent = seed();
        let child = remove_objective(&parent, &ObjectiveId::new("obj-2")).unwrap();
        assert_child_of(&child, &parent);
        assert_eq!(child.objectives.len(), 1);
        assert!(!child.has_objective(&ObjectiveId::new("obj-2")));
        assert!(child
            .fitness_criteria
            .iter()
            .all(|c| c.objective_id.as_str() != "obj-2"));
    }

    #[test]
    fn remove_last_objective_fails() {
        let parent = seed();
        let child = remove_objective(&parent, &ObjectiveId::new("obj-2")).unwrap();
        let err = remove_objective(&child, &ObjectiveId::new("obj-1")).unwrap_err();
        assert!(matches!(err, MutationError::LastObjectiveViolation(_)));
    }

    #[test]
    fn remove_unknown_objective_fails() {
        let err = remove_objective(&seed(), &ObjectiveId::new("ghost")).unwrap_err();
        assert!(matches!(err, MutationError::ObjectiveNotFound(_)));
    }

    #[test]
    fn perturb_shifts_parameter() {
        let parent = seed();
        let delta = BTreeMap::from([("strictness".to_string(), 0.1)]);
        let child = perturb_objective(&parent, &ObjectiveId::new("obj-1"), &delta).unwrap();
        assert_child_of(&child, &parent);

        let before = parent.objectives[0].parameter("strictness").unwrap();
        let after = child.objectives[0].parameter("strictness").unwrap();
        assert!((after - before - 0.1).abs() < 1e-12);
        assert_eq!(child.objectives[0].id, parent.objectives[0].id);
        assert_eq!(child.objectives[0].domain, parent.objectives[0].domain);
        assert_eq!(child.objectives[1], parent.objectives[1]);
    }

    #[test]
    fn perturb_introduces_missing_parameter() {
        let parent = seed();
        let delta = BTreeMap::from([("intensity".to_string(), 0.2)]);
        let child = perturb_objective(&parent, &ObjectiveId::new("obj-2"), &delta).unwrap();
        assert_eq!(child.objectives[1].parameter("intensity"), Some(0.2));
    }

    #[test]
    fn mutation_at_generation_limit_fails_without_panicking() {
        let mut parent = seed();
        parent.generation = u32::MAX;
        parent.parent_id = Some(telos_types::GenomeId::generate());
        assert!(parent.validate().is_ok());

        let delta = BTreeMap::from([("strictness".to_string(), 0.1)]);
        let err = perturb_objective(&parent, &ObjectiveId::new("obj-1"), &delta).unwrap_err();
        assert!(err.is_hard_failure());

        let objective = ObjectiveDescriptor::new("obj-9", "ninth", "safety", 0.2);
        assert!(add_objective(&parent, objective).is_err());
    }

    #[test]
    fn perturb_with_zero_delta_fails() {
        let parent = seed();
        let delta = BTreeMap::from([("strictness".to_string(), 0.0)]);
        let err = perturb_objective(&parent, &ObjectiveId::new("obj-1"), &delta).unwrap_err();
        assert!(matches!(err, MutationError::NoEffectivePerturbation(_)));

        let err =
            perturb_objective(&parent, &ObjectiveId::new("obj-1"), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, MutationError::NoEffectivePerturbation(_)));
    }

    #[test]
    fn recombine_prefers_heavier_objective_on_collision() {
        let a = seed();
        let b = other();
        let keep = vec![ObjectiveId::new("obj-2"), ObjectiveId::new("obj-3")];
        let child = recombine_keeping(&a, &b, &keep).unwrap();
        assert_child_of(&child, &a);
        assert_eq!(child.objectives.len(), 2);
        assert_eq!(child.objectives[0].weight, 0.9);
        assert_eq!(child.metadata.get(SECONDARY_PARENT_KEY), Some(&b.id.0));
        assert!(child.validate().is_ok());
    }

    #[test]
    fn recombine_tie_keeps_parent_a() {
        let a = seed();
        let mut b = other();
        b.objectives[0].weight = 0.3;
        b.objectives[0].description = "tie".into();
        let child = recombine_keeping(&a, &b, &[ObjectiveId::new("obj-2")]).unwrap();
        assert_eq!(child.objectives[0].description, "second");
    }

    #[test]
    fn recombine_random_subset_is_within_union() {
        let a = seed();
        let b = other();
        let union: HashSet<ObjectiveId> = a
            .objectives
            .iter()
            .chain(b.objectives.iter())
            .map(|o| o.id.clone())
            .collect();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let child = recombine(&a, &b, &mut rng).unwrap();
            assert_child_of(&child, &a);
            assert!(child.objectives.iter().all(|o| union.contains(&o.id)));
        }
    }

    #[test]
    fn recombine_with_self_fails() {
        let a = seed();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            recombine(&a, &a, &mut rng),
            Err(MutationError::MissingPartner(_))
        ));
    }

    #[test]
    fn recombine_keeping_unknown_fails() {
        let err = recombine_keeping(&seed(), &other(), &[ObjectiveId::new("nope")]).unwrap_err();
        assert!(matches!(err, MutationError::ObjectiveNotFound(_)));
    }
}
