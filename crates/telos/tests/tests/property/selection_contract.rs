//! Property tests: tournament selection returns exactly the requested
//! number of winners, each the best of its own tournament.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use telos_fitness::TournamentSelector;
use telos_tests::flat_score;
use telos_types::{FitnessScore, GenomeId};

fn arb_pool() -> impl Strategy<Value = Vec<FitnessScore>> {
    prop::collection::vec(0.0f64..=1.0, 1..40).prop_map(|aggregates| {
        aggregates
            .into_iter()
            .enumerate()
            .map(|(i, a)| flat_score(GenomeId::new(format!("g{i:03}")), a))
            .collect()
    })
}

proptest! {
    #[test]
    fn winner_count_matches_request(
        pool in arb_pool(),
        count in 0usize..50,
        tournament_size in 1usize..8,
        seed in any::<u64>(),
    ) {
        let selector = TournamentSelector::new(tournament_size).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let winners = selector.select(&pool, count, &mut rng).unwrap();

        prop_assert_eq!(winners.len(), count);
        for winner in &winners {
            prop_assert_eq!(winner.entrants.len(), tournament_size.min(pool.len()));
            prop_assert!(winner.entrants.contains(&winner.genome_id));
            prop_assert!(winner.aggregate_score >= winner.tournament_min);

            let best_entrant = pool
                .iter()
                .filter(|s| winner.entrants.contains(&s.genome_id))
                .map(|s| s.aggregate_score)
                .fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(winner.aggregate_score, best_entrant);
        }
    }
}
