//! End-to-end test: tournament selection keeps the population at its
//! configured size across generations.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use telos_fitness::TournamentSelector;
use telos_store::InMemoryGenomeStore;
use telos_tests::{flat_score, manager, seeds};
use telos_types::{GenomeId, SessionConfig, SessionStatus};

#[test]
fn twenty_candidates_yield_twenty_winners() {
    let scores: Vec<_> = (0..20)
        .map(|i| flat_score(GenomeId::new(format!("g{i:02}")), i as f64 / 20.0))
        .collect();
    let selector = TournamentSelector::new(4).unwrap();
    let mut rng = StdRng::seed_from_u64(5);

    let winners = selector.select(&scores, 20, &mut rng).unwrap();
    assert_eq!(winners.len(), 20);
    for winner in &winners {
        assert_eq!(winner.entrants.len(), 4);
        assert!(winner.aggregate_score >= winner.tournament_min);
    }
}

#[tokio::test]
async fn population_of_twenty_survives_five_rounds() {
    let m = manager(Arc::new(InMemoryGenomeStore::new()));
    let config = SessionConfig::new()
        .with_population_size(20)
        .with_max_iterations(5)
        .with_min_fitness_threshold(0.1)
        .with_rng_seed(20);
    let id = m.start_session("agent-under-test", seeds(20), config).await.unwrap();

    for round in 1..=5 {
        let report = m.run_iteration(&id).await.unwrap();
        assert!(report.ran);
        assert!(!report.weak, "round {round} was weak");
        assert_eq!(report.population_size, 20, "round {round}");
    }
    assert_eq!(
        m.report(&id).await.unwrap().status,
        SessionStatus::Completed
    );
}
