//! End-to-end test: session state machine driven through the manager.
//!
//! Covers iteration exhaustion, pause and resume, immediate stop, and the
//! compute-time budget.

use std::sync::Arc;
use std::time::Duration;

use telos_engine::SimulatedHarness;
use telos_session::{SessionError, SessionManager, StopMode};
use telos_store::InMemoryGenomeStore;
use telos_tests::{manager, quick_config, seeds, AGENT};
use telos_types::{BudgetKind, SessionStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn slow_manager(store: Arc<InMemoryGenomeStore>, latency: Duration) -> SessionManager {
    SessionManager::new(
        store,
        Arc::new(
            SimulatedHarness::new()
                .with_default_skill(1.0)
                .with_latency(latency),
        ),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_iterations_complete_the_session() {
    let store = Arc::new(InMemoryGenomeStore::new());
    let m = manager(store.clone());
    let id = m.start_session(AGENT, seeds(4), quick_config()).await.unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.current_generation, 3);
    assert_eq!(report.metrics.iterations_run, 3);
    assert!(report.finished_at.is_some());
    assert!(report.best_genome_id.is_some());

    // completed sessions accept no further work
    assert!(matches!(
        m.run_iteration(&id).await.unwrap_err(),
        SessionError::NotRunning { .. }
    ));
    assert!(store.session_count() >= 1);
}

#[tokio::test]
async fn pause_and_resume_preserve_evolution_state() {
    let store = Arc::new(InMemoryGenomeStore::new());
    let m = manager(store.clone());
    let id = m
        .start_session(AGENT, seeds(4), quick_config().with_max_iterations(4))
        .await
        .unwrap();
    m.run_iteration(&id).await.unwrap();
    m.run_iteration(&id).await.unwrap();

    let paused = m.pause(&id).await.unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.current_generation, 2);
    let before = m.session(&id).await.unwrap().evolution_state_bytes().unwrap();

    // a second process picks the session up from the store
    let other = manager(store);
    let resumed = other.resume_from_store(&id).await.unwrap();
    assert_eq!(resumed.status, SessionStatus::Running);
    let after = other.session(&id).await.unwrap().evolution_state_bytes().unwrap();
    assert_eq!(before, after);

    let finished = other.run(&id).await.unwrap();
    assert_eq!(finished.status, SessionStatus::Completed);
    assert_eq!(finished.current_generation, 4);
}

#[tokio::test]
async fn immediate_stop_discards_the_in_flight_iteration() {
    let m = slow_manager(
        Arc::new(InMemoryGenomeStore::new()),
        Duration::from_millis(200),
    );
    let id = m.start_session(AGENT, seeds(4), quick_config()).await.unwrap();
    let driver = m.spawn(id.clone());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stopped = m.stop(&id, StopMode::Immediate).await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Stopped);

    let report = driver.await.unwrap().unwrap();
    assert_eq!(report.status, SessionStatus::Stopped);
    assert_eq!(report.current_generation, 0);
    assert_eq!(report.metrics.iterations_run, 0);
    assert_eq!(report.generations_recorded, 0);
}

#[tokio::test]
async fn graceful_stop_keeps_the_in_flight_iteration() {
    let m = slow_manager(
        Arc::new(InMemoryGenomeStore::new()),
        Duration::from_millis(20),
    );
    let id = m
        .start_session(AGENT, seeds(4), quick_config().with_max_iterations(50))
        .await
        .unwrap();
    let driver = m.spawn(id.clone());

    tokio::time::sleep(Duration::from_millis(30)).await;
    let stopped = m.stop(&id, StopMode::Graceful).await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Stopped);

    let report = driver.await.unwrap().unwrap();
    assert_eq!(report.status, SessionStatus::Stopped);
    // the iteration running when stop was requested was committed
    assert!(report.current_generation >= 1);
    assert_eq!(
        report.current_generation as usize,
        report.generations_recorded
    );
}

#[tokio::test]
async fn compute_budget_ends_the_session() {
    let m = slow_manager(
        Arc::new(InMemoryGenomeStore::new()),
        Duration::from_millis(20),
    );
    let config = quick_config()
        .with_max_iterations(10)
        .with_max_compute_time_ms(50);
    let id = m.start_session(AGENT, seeds(4), config).await.unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(
        report.status,
        SessionStatus::BudgetExceeded {
            budget: BudgetKind::ComputeTime
        }
    );
    // the first iteration alone spends the whole budget
    assert_eq!(report.current_generation, 1);
    assert!(report.metrics.compute_time_ms >= 50);
}

#[tokio::test]
async fn seedless_start_is_rejected() {
    let m = manager(Arc::new(InMemoryGenomeStore::new()));
    let err = m
        .start_session(AGENT, Vec::new(), quick_config())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NoSeeds(_)));
}

#[tokio::test]
async fn next_session_continues_from_latest_population() {
    let store = Arc::new(InMemoryGenomeStore::new());
    let m = manager(store.clone());
    let first = m.start_session(AGENT, seeds(4), quick_config()).await.unwrap();
    m.run(&first).await.unwrap();
    let evolved: Vec<_> = m
        .session(&first)
        .await
        .unwrap()
        .population
        .into_iter()
        .map(|g| g.id)
        .collect();

    // caller seeds are ignored once the agent has a persisted population
    let second = m.start_session(AGENT, seeds(4), quick_config()).await.unwrap();
    let population: Vec<_> = m
        .session(&second)
        .await
        .unwrap()
        .population
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(population, evolved);
}
