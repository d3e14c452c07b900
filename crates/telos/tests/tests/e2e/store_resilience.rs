//! End-to-end test: persistence boundary behavior.
//!
//! Retention pruning, lineage of evolved genomes, validation of genomes
//! read back from the store, and sessions that keep running while the
//! store is down.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use telos_engine::FailingHarness;
use telos_session::SessionManager;
use telos_store::{GenerationRecord, GenomeStore, InMemoryGenomeStore, UnavailableStore};
use telos_tests::{flat_score, manager, quick_config, seed, seeds, AGENT};
use telos_types::{EvolutionSession, SessionId, SessionStatus};

#[tokio::test]
async fn prune_removes_only_genomes_past_retention() {
    let store = InMemoryGenomeStore::new();
    let aged: Vec<_> = [10, 20, 40]
        .into_iter()
        .map(|days| {
            let mut genome = seed(&[("code", "engineering", 1.0)]);
            genome.created_at = Utc::now() - ChronoDuration::days(days);
            genome
        })
        .collect();
    let record = GenerationRecord::new(AGENT, SessionId::generate(), 0, aged.clone(), Vec::new());
    store.persist_generation(record).await.unwrap();

    let removed = store.prune_old_genomes(30).await.unwrap();

    assert_eq!(removed, 1);
    assert!(store.contains(&aged[0].id));
    assert!(store.contains(&aged[1].id));
    assert!(!store.contains(&aged[2].id));
    assert_eq!(store.get_latest_population(AGENT).await.unwrap().len(), 2);
}

#[tokio::test]
async fn best_genome_traces_back_to_a_seed() {
    let store = Arc::new(InMemoryGenomeStore::new());
    let m = manager(store.clone());
    let initial = seeds(4);
    let seed_ids: BTreeSet<_> = initial.iter().map(|g| g.id.clone()).collect();
    let id = m.start_session(AGENT, initial, quick_config()).await.unwrap();

    let report = m.run(&id).await.unwrap();
    let best = report.best_genome_id.unwrap();

    let lineage = store.get_genome_lineage(&best).await.unwrap();
    assert_eq!(lineage.first().map(|g| &g.id), Some(&best));
    let root = lineage.last().unwrap();
    assert!(root.is_seed());
    assert!(seed_ids.contains(&root.id));
    for pair in lineage.windows(2) {
        assert_eq!(pair[0].parent_id.as_ref(), Some(&pair[1].id));
        assert_eq!(pair[0].generation, pair[1].generation + 1);
    }
}

#[tokio::test]
async fn outage_is_buffered_and_flushed_at_checkpoint() {
    let store = Arc::new(InMemoryGenomeStore::new());
    store.set_available(false);
    let m = manager(store.clone());
    let id = m.start_session(AGENT, seeds(4), quick_config()).await.unwrap();

    let report = m.run(&id).await.unwrap();
    assert_eq!(report.status, SessionStatus::Completed);
    assert!(report.metrics.store_failures > 0);
    assert_eq!(store.genome_count(), 0);
    assert_eq!(store.session_count(), 0);

    store.set_available(true);
    let flushed = m.checkpoint(&id).await.unwrap();
    assert!(flushed.generations_written > 0);
    assert_eq!(flushed.genomes_still_buffered, 0);
    assert_eq!(store.session_count(), 1);
    assert!(store.genome_count() >= 4);
}

#[tokio::test]
async fn dead_store_and_dead_harness_still_finish() {
    let m = SessionManager::new(Arc::new(UnavailableStore), Arc::new(FailingHarness));
    let id = m
        .start_session(AGENT, seeds(3), quick_config().with_max_iterations(2))
        .await
        .unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.current_generation, 2);
    assert!(report.metrics.harness_failures > 0);
    assert!(report.metrics.partial_cycles > 0);
    assert!(report.metrics.store_failures > 0);
}

#[tokio::test]
async fn stored_genomes_failing_validation_are_not_admitted() {
    let store = Arc::new(InMemoryGenomeStore::new());

    let mut stale = seed(&[("code", "engineering", 1.0)]);
    stale.schema_version = 99;
    let record = GenerationRecord::new(AGENT, SessionId::generate(), 0, vec![stale], Vec::new());
    store.persist_generation(record).await.unwrap();

    let mut foreign = seed(&[("docs", "writing", 0.8)]);
    foreign.agent_name = "neighbour".into();
    foreign.objectives.clear();
    let scores = vec![flat_score(foreign.id.clone(), 0.9)];
    let record =
        GenerationRecord::new("neighbour", SessionId::generate(), 0, vec![foreign], scores);
    store.persist_generation(record).await.unwrap();

    let m = manager(store);
    let initial = seeds(2);
    let mut config = quick_config();
    config.portfolio_seed_percent = 0.5;
    let id = m.start_session(AGENT, initial.clone(), config).await.unwrap();

    let session = m.session(&id).await.unwrap();
    let admitted: Vec<_> = session.population.iter().map(|g| g.id.clone()).collect();
    let expected: Vec<_> = initial.iter().map(|g| g.id.clone()).collect();
    assert_eq!(admitted, expected);
    assert!(session.population.iter().all(|g| g.validate().is_ok()));
    assert_eq!(session.metrics.rejected_store_genomes, 2);
}

#[tokio::test]
async fn snapshot_with_unknown_genome_version_is_not_restored() {
    let store = Arc::new(InMemoryGenomeStore::new());
    let mut snapshot = EvolutionSession::new(AGENT, quick_config());
    let mut genome = seed(&[("code", "engineering", 1.0)]);
    genome.schema_version = 99;
    snapshot.population.push(genome);
    snapshot.transition(SessionStatus::Paused).unwrap();
    store.persist_session_state(&snapshot).await.unwrap();

    let m = manager(store);
    let err = m.resume_from_store(&snapshot.id).await.unwrap_err();

    assert!(err.is_hard_failure());
    assert!(m.session_ids().await.is_empty());
}
