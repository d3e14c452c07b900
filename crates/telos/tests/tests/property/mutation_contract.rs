//! Property tests: every mutation yields a valid child one generation
//! below its parent, and perturbation is plain addition.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use telos_mutation::{perturb_objective, MutationEngine};

use crate::genome_codec::arb_genome;

proptest! {
    #[test]
    fn sampled_mutation_respects_child_contract(
        parent in arb_genome(),
        partner in arb_genome(),
        seed in any::<u64>(),
    ) {
        let engine = MutationEngine::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let partners = vec![parent.clone(), partner];

        let child = engine.mutate(&parent, None, &partners, &mut rng).unwrap();

        prop_assert_eq!(child.generation, parent.generation + 1);
        prop_assert_eq!(child.parent_id.as_ref(), Some(&parent.id));
        prop_assert!(!child.objectives.is_empty());
        prop_assert!(child.validate_child_of(&parent).is_ok());
    }

    #[test]
    fn perturb_adds_delta(
        parent in arb_genome(),
        delta in prop_oneof![-2.0f64..-0.001, 0.001f64..2.0],
    ) {
        let target = parent.objectives[0].clone();
        let before = target.parameter("strictness").unwrap_or(0.0);
        let change = BTreeMap::from([("strictness".to_string(), delta)]);

        let child = perturb_objective(&parent, &target.id, &change).unwrap();

        let after = child.objective(&target.id).unwrap().parameter("strictness").unwrap();
        prop_assert!((after - (before + delta)).abs() < 1e-9);
        for (was, now) in parent.objectives.iter().zip(&child.objectives).skip(1) {
            prop_assert_eq!(was, now);
        }
    }
}
