//! End-to-end test: alignment patterns reject conflicting candidates, and
//! pattern updates take effect from the next iteration.

use std::sync::Arc;

use telos_guard::{AlignmentGuard, AlignmentPattern, PatternBook};
use telos_store::InMemoryGenomeStore;
use telos_tests::{manager, quick_config, seed, seeds, AGENT};

fn no_shortcuts() -> AlignmentPattern {
    AlignmentPattern::new("no-shortcuts", "never trade rigor for speed", 0.9)
        .flag_domain("shortcut-seeking")
}

#[test]
fn flagged_domain_is_rejected_with_reason() {
    let guard = AlignmentGuard::new();
    let honest = seed(&[("tests", "engineering", 1.0)]);
    let sneaky = seed(&[
        ("tests", "engineering", 0.5),
        ("skip-checks", "shortcut-seeking", 0.5),
    ]);

    let outcome = guard.filter_candidates(vec![honest.clone(), sneaky.clone()], &[no_shortcuts()]);

    assert_eq!(outcome.passed.len(), 1);
    assert_eq!(outcome.passed[0].id, honest.id);
    assert_eq!(outcome.rejected.len(), 1);

    let verdict = &outcome.rejected[0];
    assert_eq!(verdict.genome_id, sneaky.id);
    assert!(!verdict.passed);
    assert_eq!(verdict.conflicts.len(), 1);
    let conflict = &verdict.conflicts[0];
    assert_eq!(conflict.objective_id.as_str(), "skip-checks");
    assert_eq!(conflict.pattern_id.as_str(), "no-shortcuts");
    assert!(!conflict.reason.is_empty());
}

#[test]
fn low_confidence_patterns_never_reject() {
    let guard = AlignmentGuard::new();
    let sneaky = seed(&[("skip-checks", "shortcut-seeking", 1.0)]);
    let tentative = AlignmentPattern::new("maybe", "unconfirmed hunch", 0.4)
        .flag_domain("shortcut-seeking");

    let verdict = guard.check(&sneaky, &[tentative]);
    assert!(verdict.passed);
    assert!(verdict.conflicts.is_empty());
}

#[tokio::test]
async fn pattern_update_applies_from_next_iteration() {
    let m = manager(Arc::new(InMemoryGenomeStore::new())).with_patterns(PatternBook::new());
    let id = m
        .start_session(AGENT, seeds(4), quick_config().with_max_iterations(5))
        .await
        .unwrap();

    let first = m.run_iteration(&id).await.unwrap();
    assert!(!first.weak);
    let before = m.session(&id).await.unwrap();
    assert_eq!(before.metrics.candidates_rejected, 0);

    // every candidate carries an engineering objective
    m.update_patterns(vec![AlignmentPattern::new(
        "no-engineering",
        "engineering work is paused",
        0.95,
    )
    .flag_domain("engineering")])
        .unwrap();

    let second = m.run_iteration(&id).await.unwrap();
    assert!(second.ran);
    assert!(second.weak);

    let after = m.session(&id).await.unwrap();
    assert!(after.metrics.candidates_rejected > 0);
    assert!(!after.metrics.conflicts.is_empty());
    assert!(after
        .metrics
        .conflicts
        .iter()
        .all(|c| c.pattern_id.as_str() == "no-engineering" && !c.reason.is_empty()));

    // the retained population is the one selected before the update
    let ids = |s: &telos_types::EvolutionSession| {
        s.population.iter().map(|g| g.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&before), ids(&after));
    assert!(after.mutation_rate > before.mutation_rate);
}
