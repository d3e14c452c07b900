//! Alignment patterns and the shared pattern book.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use telos_types::PatternId;

use crate::error::{GuardError, GuardResult};

/// Patterns at or below this confidence never reject a genome.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// A learned preference constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPattern {
    pub id: PatternId,
    pub description: String,
    /// Confidence in [0, 1] that the pattern reflects a real preference.
    pub success_score: f64,
    /// Objective domains that oppose this pattern.
    #[serde(default)]
    pub flagged_domains: Vec<String>,
    /// Parameter values above these ceilings oppose this pattern.
    #[serde(default)]
    pub parameter_ceilings: BTreeMap<String, f64>,
    /// Objective domains this pattern endorses.
    #[serde(default)]
    pub endorsed_domains: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl AlignmentPattern {
    pub fn new(
        id: impl Into<PatternId>,
        description: impl Into<String>,
        success_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            success_score,
            flagged_domains: Vec::new(),
            parameter_ceilings: BTreeMap::new(),
            endorsed_domains: Vec::new(),
            active: true,
        }
    }

    pub fn flag_domain(mut self, domain: impl Into<String>) -> Self {
        self.flagged_domains.push(domain.into());
        self
    }

    pub fn endorse_domain(mut self, domain: impl Into<String>) -> Self {
        self.endorsed_domains.push(domain.into());
        self
    }

    pub fn with_ceiling(mut self, parameter: impl Into<String>, ceiling: f64) -> Self {
        self.parameter_ceilings.insert(parameter.into(), ceiling);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether an opposing objective must be rejected.
    pub fn is_high_confidence(&self) -> bool {
        self.success_score > HIGH_CONFIDENCE_THRESHOLD
    }

    pub fn validate(&self) -> GuardResult<()> {
        if !self.success_score.is_finite() || !(0.0..=1.0).contains(&self.success_score) {
            return Err(GuardError::InvalidScore {
                id: self.id.clone(),
                score: self.success_score,
            });
        }
        Ok(())
    }
}

/// Shared, updatable set of patterns.
///
/// Clones share the same storage. Readers take a [`PatternBook::snapshot`]
/// at the start of an outer-loop iteration, so an update lands on the
/// iteration after it is made.
#[derive(Clone, Debug, Default)]
pub struct PatternBook {
    patterns: Arc<RwLock<Vec<AlignmentPattern>>>,
}

impl PatternBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_patterns(patterns: Vec<AlignmentPattern>) -> GuardResult<Self> {
        for p in &patterns {
            p.validate()?;
        }
        Ok(Self {
            patterns: Arc::new(RwLock::new(patterns)),
        })
    }

    /// Insert or replace a pattern by id.
    pub fn upsert(&self, pattern: AlignmentPattern) -> GuardResult<()> {
        pattern.validate()?;
        let mut patterns = self.patterns.write().map_err(|_| GuardError::LockPoisoned)?;
        match patterns.iter_mut().find(|p| p.id == pattern.id) {
            Some(existing) => *existing = pattern,
            None => patterns.push(pattern),
        }
        Ok(())
    }

    pub fn set_active(&self, id: &PatternId, active: bool) -> GuardResult<()> {
        let mut patterns = self.patterns.write().map_err(|_| GuardError::LockPoisoned)?;
        let pattern = patterns
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| GuardError::PatternNotFound(id.clone()))?;
        pattern.active = active;
        Ok(())
    }

    pub fn remove(&self, id: &PatternId) -> GuardResult<AlignmentPattern> {
        let mut patterns = self.patterns.write().map_err(|_| GuardError::LockPoisoned)?;
        let index = patterns
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| GuardError::PatternNotFound(id.clone()))?;
        Ok(patterns.remove(index))
    }

    /// Copy of the current patterns.
    pub fn snapshot(&self) -> GuardResult<Vec<AlignmentPattern>> {
        let patterns = self.patterns.read().map_err(|_| GuardError::LockPoisoned)?;
        Ok(patterns.clone())
    }

    pub fn len(&self) -> usize {
        self.patterns.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
