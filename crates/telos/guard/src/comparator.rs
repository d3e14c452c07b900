//! Classifies an objective's stance toward a pattern.

use telos_types::ObjectiveDescriptor;

use crate::pattern::AlignmentPattern;

/// How an objective relates to a pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Stance {
    Aligned,
    Neutral,
    Opposing { reason: String },
}

impl Stance {
    pub fn is_opposing(&self) -> bool {
        matches!(self, Self::Opposing { .. })
    }

    /// Soft compatibility value used for taste alignment.
    pub fn affinity(&self) -> f64 {
        match self {
            Self::Aligned => 1.0,
            Self::Neutral => 0.5,
            Self::Opposing { .. } => 0.0,
        }
    }
}

/// Pluggable stance classifier.
pub trait ConflictComparator: Send + Sync {
    fn classify(&self, objective: &ObjectiveDescriptor, pattern: &AlignmentPattern) -> Stance;
}

/// Domain and parameter-ceiling rules carried by the pattern itself.
///
/// Opposing: the objective's domain is flagged, or one of its parameters
/// exceeds the pattern's ceiling for that key. Aligned: the domain is
/// endorsed. Domains compare case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct RuleComparator;

impl ConflictComparator for RuleComparator {
    fn classify(&self, objective: &ObjectiveDescriptor, pattern: &AlignmentPattern) -> Stance {
        let domain = objective.domain.to_lowercase();

        if let Some(flagged) = pattern
            .flagged_domains
            .iter()
            .find(|d| d.to_lowercase() == domain)
        {
            return Stance::Opposing {
                reason: format!(
                    "domain '{}' is flagged by '{}'",
                    flagged, pattern.description
                ),
            };
        }

        for (key, ceiling) in &pattern.parameter_ceilings {
            if let Some(value) = objective.parameter(key) {
                if value > *ceiling {
                    return Stance::Opposing {
                        reason: format!(
                            "parameter '{}' = {} exceeds ceiling {} of '{}'",
                            key, value, ceiling, pattern.description
                        ),
                    };
                }
            }
        }

        if pattern
            .endorsed_domains
            .iter()
            .any(|d| d.to_lowercase() == domain)
        {
            return Stance::Aligned;
        }
        Stance::Neutral
    }
}
