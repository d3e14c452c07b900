//! End-to-end test: a seed genome mutated by each operator keeps a valid
//! lineage link to its parent.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use telos_mutation::{perturb_objective, MutationEngine, MutationType};
use telos_types::{GoalGenome, ObjectiveDescriptor, ObjectiveId};
use telos_tests::AGENT;

fn two_objective_seed() -> GoalGenome {
    GoalGenome::seed(
        AGENT,
        vec![
            ObjectiveDescriptor::new("correctness", "ship correct code", "engineering", 0.7)
                .with_parameter("strictness", 0.5),
            ObjectiveDescriptor::new("brevity", "keep answers short", "communication", 0.3),
        ],
    )
    .unwrap()
}

#[test]
fn perturb_shifts_only_the_named_objective() {
    let seed = two_objective_seed();
    let delta = BTreeMap::from([("strictness".to_string(), 0.1)]);

    let child = perturb_objective(&seed, &ObjectiveId::from("correctness"), &delta).unwrap();

    assert_eq!(child.generation, 1);
    assert_eq!(child.parent_id.as_ref(), Some(&seed.id));
    assert_ne!(child.id, seed.id);

    let strictness = child.objectives[0].parameter("strictness").unwrap();
    assert!((strictness - 0.6).abs() < 1e-12);
    assert_eq!(child.objectives[1], seed.objectives[1]);
    child.validate_child_of(&seed).unwrap();
}

#[test]
fn every_operator_yields_a_valid_child() {
    let seed = two_objective_seed();
    let partner = GoalGenome::seed(
        AGENT,
        vec![ObjectiveDescriptor::new("coverage", "test every branch", "engineering", 0.9)],
    )
    .unwrap();
    let engine = MutationEngine::new();
    let mut rng = StdRng::seed_from_u64(11);
    let partners = vec![seed.clone(), partner];

    for kind in MutationType::ALL {
        let child = engine.mutate(&seed, Some(kind), &partners, &mut rng).unwrap();
        assert_eq!(child.generation, seed.generation + 1, "{kind}");
        assert_eq!(child.parent_id.as_ref(), Some(&seed.id), "{kind}");
        assert!(!child.objectives.is_empty(), "{kind}");
        child.validate_child_of(&seed).unwrap();
    }
}

#[test]
fn removing_the_last_objective_is_refused() {
    let single = GoalGenome::seed(
        AGENT,
        vec![ObjectiveDescriptor::new("only", "the only goal", "engineering", 1.0)],
    )
    .unwrap();
    let engine = MutationEngine::new();
    let mut rng = StdRng::seed_from_u64(3);

    assert!(engine
        .mutate(&single, Some(MutationType::Remove), &[], &mut rng)
        .is_err());

    // sampling never picks Remove for a single-objective genome
    for _ in 0..50 {
        let child = engine.mutate(&single, None, &[], &mut rng).unwrap();
        assert!(!child.objectives.is_empty());
    }
}
