//! Mutation kinds and their payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use telos_types::{GoalGenome, ObjectiveDescriptor, ObjectiveId};

/// The closed set of mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    Add,
    Remove,
    Perturb,
    Recombine,
}

impl MutationType {
    pub const ALL: [MutationType; 4] = [Self::Add, Self::Remove, Self::Perturb, Self::Recombine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Perturb => "perturb",
            Self::Recombine => "recombine",
        }
    }
}

impl std::fmt::Display for MutationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully parameterised mutation, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add(ObjectiveDescriptor),
    Remove(ObjectiveId),
    Perturb {
        objective_id: ObjectiveId,
        delta: BTreeMap<String, f64>,
    },
    Recombine {
        partner: GoalGenome,
        /// Union members to keep, by objective id. `None` keeps a random
        /// non-empty subset.
        keep: Option<Vec<ObjectiveId>>,
    },
}

impl Mutation {
    pub fn kind(&self) -> MutationType {
        match self {
            Self::Add(_) => MutationType::Add,
            Self::Remove(_) => MutationType::Remove,
            Self::Perturb { .. } => MutationType::Perturb,
            Self::Recombine { .. } => MutationType::Recombine,
        }
    }
}

/// Relative sampling weight of each operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationWeights {
    pub add: f64,
    pub remove: f64,
    pub perturb: f64,
    pub recombine: f64,
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            add: 0.15,
            remove: 0.15,
            perturb: 0.35,
            recombine: 0.35,
        }
    }
}

impl MutationWeights {
    pub fn weight(&self, kind: MutationType) -> f64 {
        match kind {
            MutationType::Add => self.add,
            MutationType::Remove => self.remove,
            MutationType::Perturb => self.perturb,
            MutationType::Recombine => self.recombine,
        }
    }
}
