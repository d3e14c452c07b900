//! The goal genome: objectives, fitness criteria and lineage.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{supported_schema_versions, CURRENT_SCHEMA_VERSION};
use crate::curriculum::ObjectiveMeasurement;
use crate::error::{ModelError, ModelResult};
use crate::ids::{GenomeId, ObjectiveId};

/// Criterion metric refreshed from per-objective pass rates.
pub const PASS_RATE_METRIC: &str = "pass_rate";

/// Criterion metric refreshed from mean task scores.
pub const MEAN_SCORE_METRIC: &str = "mean_score";

/// Default target for auto-generated pass-rate criteria.
const DEFAULT_PASS_RATE_TARGET: f64 = 0.8;

// ── Objective ───────────────────────────────────────────────────────

/// One objective an agent pursues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectiveDescriptor {
    /// Unique within the owning genome.
    pub id: ObjectiveId,
    /// Human-readable description.
    pub description: String,
    /// Free-form classification tag (e.g. "code-quality").
    pub domain: String,
    /// Tunable knobs.
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    /// Relative importance in [0.0, 1.0].
    pub weight: f64,
}

impl ObjectiveDescriptor {
    pub fn new(
        id: impl Into<ObjectiveId>,
        description: impl Into<String>,
        domain: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            domain: domain.into(),
            parameters: BTreeMap::new(),
            weight: weight.clamp(0.0, 1.0),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn parameter(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).copied()
    }

    fn validate(&self) -> ModelResult<()> {
        if self.id.as_str().is_empty() {
            return Err(ModelError::InvariantViolation(
                "objective id must not be empty".into(),
            ));
        }
        if !self.weight.is_finite() || !(0.0..=1.0).contains(&self.weight) {
            return Err(ModelError::InvariantViolation(format!(
                "objective {} weight {} outside [0, 1]",
                self.id, self.weight
            )));
        }
        if let Some((key, value)) = self.parameters.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::InvariantViolation(format!(
                "objective {} parameter {} is not finite ({})",
                self.id, key, value
            )));
        }
        Ok(())
    }
}

// ── Fitness Criterion ───────────────────────────────────────────────

/// A measurable target attached to one objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitnessCriterion {
    pub objective_id: ObjectiveId,
    pub metric_name: String,
    pub target_value: f64,
    /// Last measured value; `None` until the first inner-loop cycle.
    #[serde(default)]
    pub current_value: Option<f64>,
}

impl FitnessCriterion {
    pub fn new(
        objective_id: impl Into<ObjectiveId>,
        metric_name: impl Into<String>,
        target_value: f64,
    ) -> Self {
        Self {
            objective_id: objective_id.into(),
            metric_name: metric_name.into(),
            target_value,
            current_value: None,
        }
    }

    /// The default pass-rate criterion attached to new objectives.
    pub fn pass_rate(objective_id: impl Into<ObjectiveId>) -> Self {
        Self::new(objective_id, PASS_RATE_METRIC, DEFAULT_PASS_RATE_TARGET)
    }

    /// Whether the last measurement reached the target.
    pub fn is_met(&self) -> bool {
        self.current_value
            .map(|v| v >= self.target_value)
            .unwrap_or(false)
    }
}

// ── Goal Genome ─────────────────────────────────────────────────────

/// Versioned record of an agent's objectives.
///
/// Immutable by convention: mutation operators never edit a genome in
/// place, they derive a child with a new id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalGenome {
    pub id: GenomeId,
    pub schema_version: u32,
    pub agent_name: String,
    /// 0 for seeds, otherwise `parent.generation + 1`.
    pub generation: u32,
    /// Absent for seeds.
    #[serde(default)]
    pub parent_id: Option<GenomeId>,
    pub objectives: Vec<ObjectiveDescriptor>,
    #[serde(default)]
    pub fitness_criteria: Vec<FitnessCriterion>,
    pub created_at: DateTime<Utc>,
    /// Provenance notes (e.g. which mutation produced the genome).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl GoalGenome {
    /// Create a validated seed genome (generation 0, no parent).
    ///
    /// Each objective receives a default pass-rate criterion.
    pub fn seed(
        agent_name: impl Into<String>,
        objectives: Vec<ObjectiveDescriptor>,
    ) -> ModelResult<Self> {
        let fitness_criteria = objectives
            .iter()
            .map(|o| FitnessCriterion::pass_rate(o.id.clone()))
            .collect();
        let genome = Self {
            id: GenomeId::generate(),
            schema_version: CURRENT_SCHEMA_VERSION,
            agent_name: agent_name.into(),
            generation: 0,
            parent_id: None,
            objectives,
            fitness_criteria,
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        };
        genome.validate()?;
        Ok(genome)
    }

    /// Derive an unvalidated child of `self`.
    ///
    /// Callers (the mutation engine) are responsible for running
    /// [`GoalGenome::validate_child_of`] before handing the child out.
    /// Fails only when the generation counter is exhausted.
    pub fn derive_child(
        &self,
        objectives: Vec<ObjectiveDescriptor>,
        fitness_criteria: Vec<FitnessCriterion>,
    ) -> ModelResult<Self> {
        Ok(Self {
            id: GenomeId::generate(),
            schema_version: CURRENT_SCHEMA_VERSION,
            agent_name: self.agent_name.clone(),
            generation: self.next_generation()?,
            parent_id: Some(self.id.clone()),
            objectives,
            fitness_criteria,
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
        })
    }

    fn next_generation(&self) -> ModelResult<u32> {
        self.generation.checked_add(1).ok_or_else(|| {
            ModelError::InvariantViolation(format!(
                "genome {} is at the last representable generation {}",
                self.id, self.generation
            ))
        })
    }

    pub fn with_criterion(mut self, criterion: FitnessCriterion) -> Self {
        self.fitness_criteria.push(criterion);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_seed(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn objective(&self, id: &ObjectiveId) -> Option<&ObjectiveDescriptor> {
        self.objectives.iter().find(|o| &o.id == id)
    }

    pub fn has_objective(&self, id: &ObjectiveId) -> bool {
        self.objective(id).is_some()
    }

    pub fn objective_ids(&self) -> Vec<&ObjectiveId> {
        self.objectives.iter().map(|o| &o.id).collect()
    }

    /// Sum of objective weights.
    pub fn total_weight(&self) -> f64 {
        self.objectives.iter().map(|o| o.weight).sum()
    }

    /// Check the invariant set.
    pub fn validate(&self) -> ModelResult<()> {
        let supported = supported_schema_versions();
        if !supported.contains(&self.schema_version) {
            return Err(ModelError::UnknownSchemaVersion {
                found: u64::from(self.schema_version),
                min_supported: *supported.start(),
                max_supported: *supported.end(),
            });
        }
        if self.objectives.is_empty() {
            return Err(ModelError::InvariantViolation(format!(
                "genome {} has no objectives",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for objective in &self.objectives {
            objective.validate()?;
            if !seen.insert(&objective.id) {
                return Err(ModelError::InvariantViolation(format!(
                    "genome {} has duplicate objective id {}",
                    self.id, objective.id
                )));
            }
        }

        for criterion in &self.fitness_criteria {
            if !seen.contains(&criterion.objective_id) {
                return Err(ModelError::InvariantViolation(format!(
                    "criterion {} references unknown objective {}",
                    criterion.metric_name, criterion.objective_id
                )));
            }
        }

        match (&self.parent_id, self.generation) {
            (None, 0) | (Some(_), 1..) => {}
            (None, g) => {
                return Err(ModelError::InvariantViolation(format!(
                    "genome {} has generation {} but no parent",
                    self.id, g
                )))
            }
            (Some(parent), 0) => {
                return Err(ModelError::InvariantViolation(format!(
                    "genome {} is generation 0 but names parent {}",
                    self.id, parent
                )))
            }
        }
        if self.parent_id.as_ref() == Some(&self.id) {
            return Err(ModelError::InvariantViolation(format!(
                "genome {} is its own parent",
                self.id
            )));
        }
        Ok(())
    }

    /// Check the invariant set plus the parent/child arithmetic.
    pub fn validate_child_of(&self, parent: &GoalGenome) -> ModelResult<()> {
        self.validate()?;
        if parent.generation.checked_add(1) != Some(self.generation) {
            return Err(ModelError::InvariantViolation(format!(
                "child generation {} != parent generation {} + 1",
                self.generation, parent.generation
            )));
        }
        if self.parent_id.as_ref() != Some(&parent.id) {
            return Err(ModelError::InvariantViolation(format!(
                "child {} does not name parent {}",
                self.id, parent.id
            )));
        }
        if self.id == parent.id {
            return Err(ModelError::InvariantViolation(format!(
                "child reuses parent id {}",
                parent.id
            )));
        }
        Ok(())
    }

    /// Copy with fitness criteria refreshed from one inner-loop cycle.
    ///
    /// Only `pass_rate` and `mean_score` criteria are updated; identity,
    /// lineage and objectives stay untouched.
    pub fn record_measurements(
        &self,
        measurements: &BTreeMap<ObjectiveId, ObjectiveMeasurement>,
    ) -> GoalGenome {
        let mut updated = self.clone();
        for criterion in &mut updated.fitness_criteria {
            let Some(m) = measurements.get(&criterion.objective_id) else {
                continue;
            };
            match criterion.metric_name.as_str() {
                PASS_RATE_METRIC => criterion.current_value = Some(m.effective_pass_rate()),
                MEAN_SCORE_METRIC => criterion.current_value = Some(m.mean_score),
                _ => {}
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_objective_seed() -> GoalGenome {
        GoalGenome::seed(
            "agent-a",
            vec![
                ObjectiveDescriptor::new("accuracy", "answer correctly", "correctness", 0.7)
                    .with_parameter("strictness", 0.5),
                ObjectiveDescriptor::new("brevity", "keep answers short", "style", 0.3),
            ],
        )
        .unwrap()
    }

    #[test]
    fn seed_is_generation_zero_without_parent() {
        let g = two_objective_seed();
        assert_eq!(g.generation, 0);
        assert!(g.is_seed());
        assert_eq!(g.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(g.fitness_criteria.len(), 2);
    }

    #[test]
    fn seed_rejects_empty_objectives() {
        let result = GoalGenome::seed("agent-a", vec![]);
        assert!(matches!(result, Err(ModelError::InvariantViolation(_))));
    }

    #[test]
    fn seed_rejects_duplicate_objective_ids() {
        let result = GoalGenome::seed(
            "agent-a",
            vec![
                ObjectiveDescriptor::new("x", "a", "d", 0.5),
                ObjectiveDescriptor::new("x", "b", "d", 0.5),
            ],
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate objective id x"));
    }

    #[test]
    fn dangling_criterion_rejected() {
        let g = two_objective_seed().with_criterion(FitnessCriterion::pass_rate("ghost"));
        assert!(g.validate().is_err());
    }

    #[test]
    fn non_finite_parameter_rejected() {
        let mut g = two_objective_seed();
        g.objectives[0].parameters.insert("bad".into(), f64::NAN);
        assert!(g.validate().is_err());
    }

    #[test]
    fn weight_is_clamped_by_constructor() {
        let o = ObjectiveDescriptor::new("o", "d", "x", 1.7);
        assert_eq!(o.weight, 1.0);
    }

    #[test]
    fn generation_parent_consistency() {
        let mut g = two_objective_seed();
        g.generation = 2;
        assert!(g.validate().is_err());

        let mut g = two_objective_seed();
        g.parent_id = Some(GenomeId::generate());
        assert!(g.validate().is_err());
    }

    #[test]
    fn derive_child_links_lineage() {
        let parent = two_objective_seed();
        let child = parent.derive_child(parent.objectives.clone(), vec![]).unwrap();
        assert_eq!(child.generation, 1);
        assert_eq!(child.parent_id.as_ref(), Some(&parent.id));
        assert!(child.validate_child_of(&parent).is_ok());
    }

    #[test]
    fn validate_child_of_detects_wrong_parent() {
        let parent = two_objective_seed();
        let other = two_objective_seed();
        let child = other.derive_child(other.objectives.clone(), vec![]).unwrap();
        assert!(child.validate_child_of(&parent).is_err());
    }

    #[test]
    fn derive_child_at_generation_limit_fails() {
        let mut parent = two_objective_seed();
        parent.generation = u32::MAX;
        parent.parent_id = Some(GenomeId::generate());
        assert!(parent.validate().is_ok());

        let result = parent.derive_child(parent.objectives.clone(), vec![]);
        assert!(matches!(result, Err(ModelError::InvariantViolation(_))));
    }

    #[test]
    fn validate_child_of_handles_generation_limit() {
        let mut parent = two_objective_seed();
        parent.generation = u32::MAX;
        parent.parent_id = Some(GenomeId::generate());

        let mut child = parent.clone();
        child.id = GenomeId::generate();
        child.generation = 0;
        child.parent_id = None;
        assert!(child.validate_child_of(&parent).is_err());
    }

    #[test]
    fn record_measurements_updates_known_metrics() {
        let g = two_objective_seed().with_criterion(FitnessCriterion::new(
            "accuracy",
            MEAN_SCORE_METRIC,
            0.9,
        ));
        let mut m = BTreeMap::new();
        m.insert(
            ObjectiveId::new("accuracy"),
            ObjectiveMeasurement {
                pass_rate: 0.75,
                mean_score: 0.6,
                tasks_run: 4,
                zeroed: false,
            },
        );
        let updated = g.record_measurements(&m);
        assert_eq!(updated.id, g.id);
        assert_eq!(updated.fitness_criteria[0].current_value, Some(0.75));
        assert_eq!(updated.fitness_criteria[1].current_value, None);
        assert_eq!(updated.fitness_criteria[2].current_value, Some(0.6));
        assert!(!updated.fitness_criteria[0].is_met());
    }

    #[test]
    fn zeroed_objective_records_zero_pass_rate() {
        let g = two_objective_seed();
        let mut m = BTreeMap::new();
        m.insert(
            ObjectiveId::new("brevity"),
            ObjectiveMeasurement {
                pass_rate: 0.5,
                mean_score: 0.4,
                tasks_run: 2,
                zeroed: true,
            },
        );
        let updated = g.record_measurements(&m);
        assert_eq!(updated.fitness_criteria[1].current_value, Some(0.0));
    }
}
