//! Property tests: any chain of mutations traces back to its seed, one
//! generation per hop.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use telos_mutation::MutationEngine;
use telos_types::{LineageError, LineageIndex};

use crate::genome_codec::arb_genome;

proptest! {
    #[test]
    fn mutation_chains_trace_to_seed(
        seed_genome in arb_genome(),
        depth in 1usize..12,
        seed in any::<u64>(),
    ) {
        let engine = MutationEngine::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chain = vec![seed_genome.clone()];
        for _ in 0..depth {
            let parent = chain.last().unwrap().clone();
            let child = engine.mutate(&parent, None, &[], &mut rng).unwrap();
            chain.push(child);
        }

        let index = LineageIndex::from_genomes(&chain);
        let tip = &chain[depth].id;

        prop_assert_eq!(index.depth(tip).unwrap(), depth);
        prop_assert_eq!(index.root_of(tip).unwrap(), seed_genome.id.clone());
        prop_assert!(index.verify().is_ok());
    }

    #[test]
    fn missing_link_is_reported(
        seed_genome in arb_genome(),
        depth in 2usize..8,
        seed in any::<u64>(),
    ) {
        let engine = MutationEngine::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chain = vec![seed_genome];
        for _ in 0..depth {
            let parent = chain.last().unwrap().clone();
            chain.push(engine.mutate(&parent, None, &[], &mut rng).unwrap());
        }

        let mut index = LineageIndex::from_genomes(&chain);
        index.remove(&chain[1].id);

        let is_missing_ancestor = matches!(
            index.trace(&chain[depth].id),
            Err(LineageError::MissingAncestor { .. })
        );
        prop_assert!(is_missing_ancestor);
    }
}
