#[path = "e2e/genome_mutation.rs"]
mod genome_mutation;

#[path = "e2e/tournament_selection.rs"]
mod tournament_selection;

#[path = "e2e/session_lifecycle.rs"]
mod session_lifecycle;

#[path = "e2e/alignment_guard.rs"]
mod alignment_guard;

#[path = "e2e/store_resilience.rs"]
mod store_resilience;

#[path = "e2e/critique_panel.rs"]
mod critique_panel;
