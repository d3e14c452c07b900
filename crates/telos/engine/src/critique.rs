//! Multi-reviewer critique boundary.
//!
//! After fitness evaluation the top candidates may be sent to a panel of
//! reviewers. A candidate rejected by every reviewer that judged it is dropped;
//! the rest have their aggregate blended with the reviewers' mean score.
//! Timeouts, collaborator errors and panels smaller than
//! [`MIN_REVIEWERS`] all fall back to fitness scores alone.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use telos_types::{FitnessScore, GenomeId, GoalGenome};
use tracing::debug;

use crate::error::{CritiqueError, CritiqueResult};

/// Fewest distinct reviewers whose verdicts are acted on.
pub const MIN_REVIEWERS: usize = 2;

// ── Request / Verdict ───────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct CritiqueRequest {
    pub genome: GoalGenome,
    pub score: FitnessScore,
}

/// One reviewer's opinion of one candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewerVerdict {
    pub reviewer: String,
    pub genome_id: GenomeId,
    /// Score in [0, 1]; clamped on ingestion.
    pub score: f64,
    pub reject: bool,
    pub note: Option<String>,
}

impl ReviewerVerdict {
    pub fn approve(reviewer: impl Into<String>, genome_id: GenomeId, score: f64) -> Self {
        Self {
            reviewer: reviewer.into(),
            genome_id,
            score,
            reject: false,
            note: None,
        }
    }

    pub fn reject(
        reviewer: impl Into<String>,
        genome_id: GenomeId,
        note: impl Into<String>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            genome_id,
            score: 0.0,
            reject: true,
            note: Some(note.into()),
        }
    }
}

/// Consolidated panel decision.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CritiqueReport {
    pub reviewers: usize,
    /// Mean reviewer score per surviving candidate.
    pub mean_scores: BTreeMap<GenomeId, f64>,
    /// Candidates rejected by every reviewer that gave them a verdict.
    pub excluded: BTreeSet<GenomeId>,
}

impl CritiqueReport {
    /// Apply the report to a scored candidate. `None` means the candidate
    /// was excluded.
    pub fn apply(&self, score: FitnessScore, weight: f64) -> Option<FitnessScore> {
        if self.excluded.contains(&score.genome_id) {
            return None;
        }
        match self.mean_scores.get(&score.genome_id) {
            Some(mean) => Some(score.with_critique(*mean, weight)),
            None => Some(score),
        }
    }
}

// ── Collaborator Trait ──────────────────────────────────────────────────

#[async_trait]
pub trait CritiqueCollaborator: Send + Sync {
    /// Verdicts from every reviewer that responded, in any order.
    async fn review(&self, candidates: &[CritiqueRequest]) -> CritiqueResult<Vec<ReviewerVerdict>>;

    /// Name of this collaborator for logging.
    fn name(&self) -> &str;
}

/// Ask the panel and consolidate its verdicts, bounded by `timeout`.
pub async fn run_critique(
    collaborator: &dyn CritiqueCollaborator,
    candidates: &[CritiqueRequest],
    timeout: Duration,
) -> CritiqueResult<CritiqueReport> {
    let verdicts = tokio::time::timeout(timeout, collaborator.review(candidates))
        .await
        .map_err(|_| CritiqueError::Timeout(timeout))??;

    let known: BTreeSet<&GenomeId> = candidates.iter().map(|c| &c.genome.id).collect();
    let verdicts: Vec<&ReviewerVerdict> = verdicts
        .iter()
        .filter(|v| known.contains(&v.genome_id))
        .collect();

    let reviewers: BTreeSet<&str> = verdicts.iter().map(|v| v.reviewer.as_str()).collect();
    if reviewers.len() < MIN_REVIEWERS {
        return Err(CritiqueError::InsufficientReviewers {
            responded: reviewers.len(),
            required: MIN_REVIEWERS,
        });
    }

    let mut report = CritiqueReport {
        reviewers: reviewers.len(),
        ..Default::default()
    };
    for candidate in candidates {
        let id = &candidate.genome.id;
        // one verdict per reviewer; a later verdict replaces an earlier one
        let mine: BTreeMap<&str, &ReviewerVerdict> = verdicts
            .iter()
            .filter(|v| &v.genome_id == id)
            .map(|v| (v.reviewer.as_str(), *v))
            .collect();
        if mine.is_empty() {
            continue;
        }
        if mine.values().all(|v| v.reject) {
            debug!(
                genome_id = %id.short(),
                reviewers = mine.len(),
                "Unanimously rejected by critique panel"
            );
            report.excluded.insert(id.clone());
            continue;
        }
        // rejections count as zero in the mean
        let total: f64 = mine
            .values()
            .filter(|v| !v.reject)
            .map(|v| if v.score.is_finite() { v.score.clamp(0.0, 1.0) } else { 0.0 })
            .sum();
        report.mean_scores.insert(id.clone(), total / mine.len() as f64);
    }
    Ok(report)
}

// ── Noop Critique ───────────────────────────────────────────────────────

/// Collaborator with no reviewers; every critique falls back.
#[derive(Debug, Default)]
pub struct NoopCritique;

#[async_trait]
impl CritiqueCollaborator for NoopCritique {
    async fn review(
        &self,
        _candidates: &[CritiqueRequest],
    ) -> CritiqueResult<Vec<ReviewerVerdict>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "noop-critique"
    }
}

// ── Scripted Critique ───────────────────────────────────────────────────

/// Rule-driven panel for tests and demos.
///
/// Every reviewer scores every candidate with the same score, and rejects
/// candidates carrying an objective in one of its rejected domains.
#[derive(Debug, Clone)]
pub struct ScriptedCritique {
    reviewers: Vec<String>,
    score: f64,
    rejections: Vec<(Option<String>, String)>,
    delay: Option<Duration>,
    error: Option<String>,
}

impl ScriptedCritique {
    pub fn new<I, S>(reviewers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reviewers: reviewers.into_iter().map(Into::into).collect(),
            score: 0.5,
            rejections: Vec::new(),
            delay: None,
            error: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// All reviewers reject candidates with an objective in `domain`.
    pub fn reject_domain(mut self, domain: impl Into<String>) -> Self {
        self.rejections.push((None, domain.into()));
        self
    }

    /// Only `reviewer` rejects candidates with an objective in `domain`.
    pub fn reviewer_rejects_domain(
        mut self,
        reviewer: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        self.rejections.push((Some(reviewer.into()), domain.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    fn rejects(&self, reviewer: &str, genome: &GoalGenome) -> Option<&str> {
        self.rejections
            .iter()
            .filter(|(who, _)| who.as_deref().map_or(true, |w| w == reviewer))
            .map(|(_, domain)| domain.as_str())
            .find(|domain| {
                genome
                    .objectives
                    .iter()
                    .any(|o| o.domain.eq_ignore_ascii_case(domain))
            })
    }
}

#[async_trait]
impl CritiqueCollaborator for ScriptedCritique {
    async fn review(&self, candidates: &[CritiqueRequest]) -> CritiqueResult<Vec<ReviewerVerdict>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.error {
            return Err(CritiqueError::Collaborator(message.clone()));
        }
        let mut verdicts = Vec::with_capacity(self.reviewers.len() * candidates.len());
        for reviewer in &self.reviewers {
            for candidate in candidates {
                let id = candidate.genome.id.clone();
                let verdict = match self.rejects(reviewer, &candidate.genome) {
                    Some(domain) => {
                        ReviewerVerdict::reject(reviewer.as_str(), id, format!("domain '{domain}'"))
                    }
                    None => ReviewerVerdict::approve(reviewer.as_str(), id, self.score),
                };
                verdicts.push(verdict);
            }
        }
        Ok(verdicts)
    }

    fn name(&self) -> &str {
        "scripted-critique"
    }
}
