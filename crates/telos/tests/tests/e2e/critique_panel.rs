//! End-to-end test: the optional critique step inside a running session.

use std::sync::Arc;
use std::time::Duration;

use telos_engine::ScriptedCritique;
use telos_store::InMemoryGenomeStore;
use telos_tests::{manager, quick_config, seeds, AGENT};
use telos_types::SessionStatus;

#[tokio::test]
async fn unanimous_rejections_are_excluded() {
    let panel = ScriptedCritique::new(["rigor", "safety"]).reject_domain("engineering");
    let m = manager(Arc::new(InMemoryGenomeStore::new())).with_critique(Arc::new(panel));
    let id = m
        .start_session(AGENT, seeds(4), quick_config().with_critique(true))
        .await
        .unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert!(report.metrics.critique_exclusions > 0);
    assert_eq!(report.metrics.critique_fallbacks, 0);
}

#[tokio::test]
async fn approving_panel_blends_into_scores() {
    let panel = ScriptedCritique::new(["rigor", "safety"]).with_score(1.0);
    let m = manager(Arc::new(InMemoryGenomeStore::new())).with_critique(Arc::new(panel));
    let id = m
        .start_session(
            AGENT,
            seeds(4),
            quick_config().with_critique(true).with_max_iterations(1),
        )
        .await
        .unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.metrics.critique_exclusions, 0);
    assert_eq!(report.metrics.critique_fallbacks, 0);
    let session = m.session(&id).await.unwrap();
    assert!(session
        .population_scores
        .iter()
        .any(|s| s.critique_score == Some(1.0)));
}

#[tokio::test]
async fn lone_reviewer_falls_back_to_fitness() {
    let panel = ScriptedCritique::new(["solo"]).reject_domain("engineering");
    let m = manager(Arc::new(InMemoryGenomeStore::new())).with_critique(Arc::new(panel));
    let id = m
        .start_session(AGENT, seeds(4), quick_config().with_critique(true))
        .await
        .unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.metrics.critique_fallbacks, 3);
    assert_eq!(report.metrics.critique_exclusions, 0);
    assert_eq!(report.metrics.weak_generations, 0);
}

#[tokio::test]
async fn slow_panel_times_out_without_stalling() {
    let panel = ScriptedCritique::new(["rigor", "safety"]).with_delay(Duration::from_secs(30));
    let m = manager(Arc::new(InMemoryGenomeStore::new())).with_critique(Arc::new(panel));
    let mut config = quick_config().with_critique(true).with_max_iterations(1);
    config.critique_timeout_ms = 20;
    let id = m.start_session(AGENT, seeds(4), config).await.unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.metrics.critique_fallbacks, 1);
}

#[tokio::test]
async fn disabled_critique_never_consults_the_panel() {
    let panel = ScriptedCritique::new(["rigor", "safety"]).failing("should not be called");
    let m = manager(Arc::new(InMemoryGenomeStore::new())).with_critique(Arc::new(panel));
    let id = m.start_session(AGENT, seeds(4), quick_config()).await.unwrap();

    let report = m.run(&id).await.unwrap();

    assert_eq!(report.metrics.critique_fallbacks, 0);
    assert_eq!(report.metrics.critique_exclusions, 0);
}
