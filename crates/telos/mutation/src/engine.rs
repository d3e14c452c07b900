//! Mutation dispatch and parameter sampling.

use std::collections::BTreeMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use telos_types::{GoalGenome, ObjectiveDescriptor, ObjectiveId};
use tracing::debug;

use crate::error::{MutationError, MutationResult};
use crate::operators::{
    add_objective, perturb_objective, recombine, recombine_keeping, remove_objective,
};
use crate::types::{Mutation, MutationType, MutationWeights};

/// Parameter introduced when perturbing an objective that has none.
pub const DEFAULT_PERTURB_PARAMETER: &str = "intensity";

const MIN_PERTURBATION: f64 = 0.01;
const MAX_PERTURBATION: f64 = 0.2;

/// Chooses and applies mutation operators.
#[derive(Debug, Clone, Default)]
pub struct MutationEngine {
    weights: MutationWeights,
}

impl MutationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: MutationWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &MutationWeights {
        &self.weights
    }

    /// Apply a fully specified mutation.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        genome: &GoalGenome,
        mutation: Mutation,
        rng: &mut R,
    ) -> MutationResult<GoalGenome> {
        let kind = mutation.kind();
        let child = match mutation {
            Mutation::Add(objective) => add_objective(genome, objective),
            Mutation::Remove(objective_id) => remove_objective(genome, &objective_id),
            Mutation::Perturb {
                objective_id,
                delta,
            } => perturb_objective(genome, &objective_id, &delta),
            Mutation::Recombine {
                partner,
                keep: Some(keep),
            } => recombine_keeping(genome, &partner, &keep),
            Mutation::Recombine {
                partner,
                keep: None,
            } => recombine(genome, &partner, rng),
        }?;
        debug!(
            parent = %genome.id.short(),
            child = %child.id.short(),
            mutation = %kind,
            objectives = child.objectives.len(),
            "Genome mutated"
        );
        Ok(child)
    }

    /// Produce one child of `genome`.
    ///
    /// With `mutation_type` omitted an operator is sampled by weight,
    /// excluding `Remove` for single-objective genomes and `Recombine`
    /// when `partners` holds no genome other than `genome`.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        genome: &GoalGenome,
        mutation_type: Option<MutationType>,
        partners: &[GoalGenome],
        rng: &mut R,
    ) -> MutationResult<GoalGenome> {
        let eligible: Vec<&GoalGenome> = partners.iter().filter(|p| p.id != genome.id).collect();
        let kind = match mutation_type {
            Some(kind) => kind,
            None => self.sample_type(genome, !eligible.is_empty(), rng)?,
        };
        let mutation = self.sample_mutation(genome, kind, &eligible, rng)?;
        self.apply(genome, mutation, rng)
    }

    /// Pick an operator allowed for `genome`.
    pub fn sample_type<R: Rng + ?Sized>(
        &self,
        genome: &GoalGenome,
        has_partner: bool,
        rng: &mut R,
    ) -> MutationResult<MutationType> {
        let allowed: Vec<MutationType> = MutationType::ALL
            .into_iter()
            .filter(|kind| match kind {
                MutationType::Remove => genome.objectives.len() > 1,
                MutationType::Recombine => has_partner,
                MutationType::Add | MutationType::Perturb => true,
            })
            .filter(|kind| self.weights.weight(*kind) > 0.0)
            .collect();

        let weights: Vec<f64> = allowed.iter().map(|k| self.weights.weight(*k)).collect();
        let dist = WeightedIndex::new(&weights).map_err(|e| {
            MutationError::InvalidObjective(format!("no mutation operator available: {e}"))
        })?;
        Ok(allowed[dist.sample(rng)])
    }

    fn sample_mutation<R: Rng + ?Sized>(
        &self,
        genome: &GoalGenome,
        kind: MutationType,
        partners: &[&GoalGenome],
        rng: &mut R,
    ) -> MutationResult<Mutation> {
        match kind {
            MutationType::Add => Ok(Mutation::Add(sample_new_objective(genome, partners, rng)?)),
            MutationType::Remove => {
                let target = pick_objective(genome, rng)?;
                Ok(Mutation::Remove(target))
            }
            MutationType::Perturb => {
                let objective_id = pick_objective(genome, rng)?;
                let key = genome
                    .objective(&objective_id)
                    .and_then(|o| {
                        let keys: Vec<&String> = o.parameters.keys().collect();
                        keys.choose(rng).map(|k| (*k).clone())
                    })
                    .unwrap_or_else(|| DEFAULT_PERTURB_PARAMETER.to_string());
                let magnitude = rng.gen_range(MIN_PERTURBATION..=MAX_PERTURBATION);
                let step = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
                Ok(Mutation::Perturb {
                    objective_id,
                    delta: BTreeMap::from([(key, step)]),
                })
            }
            MutationType::Recombine => {
                let partner = partners
                    .choose(rng)
                    .ok_or_else(|| MutationError::MissingPartner(genome.id.clone()))?;
                Ok(Mutation::Recombine {
                    partner: (*partner).clone(),
                    keep: None,
                })
            }
        }
    }
}

fn pick_objective<R: Rng + ?Sized>(
    genome: &GoalGenome,
    rng: &mut R,
) -> MutationResult<ObjectiveId> {
    genome
        .objectives
        .choose(rng)
        .map(|o| o.id.clone())
        .ok_or_else(|| no_objectives(genome))
}

fn no_objectives(genome: &GoalGenome) -> MutationError {
    MutationError::InvariantViolation(format!("genome {} has no objectives", genome.id))
}

/// Adopt an objective a partner holds and `genome` lacks, or derive a
/// renamed variant of one of `genome`'s own objectives.
fn sample_new_objective<R: Rng + ?Sized>(
    genome: &GoalGenome,
    partners: &[&GoalGenome],
    rng: &mut R,
) -> MutationResult<ObjectiveDescriptor> {
    let foreign: Vec<&ObjectiveDescriptor> = partners
        .iter()
        .flat_map(|p| p.objectives.iter())
        .filter(|o| !genome.has_objective(&o.id))
        .collect();
    if let Some(adopted) = foreign.choose(rng) {
        return Ok((*adopted).clone());
    }

    let base = genome
        .objectives
        .choose(rng)
        .ok_or_else(|| no_objectives(genome))?;
    let id = (1..)
        .map(|n| ObjectiveId::new(format!("{}-v{}", base.id, n)))
        .find(|candidate| !genome.has_objective(candidate))
        .ok_or_else(|| MutationError::InvalidObjective("no free variant id".into()))?;

    let mut variant = base.clone();
    variant.id = id;
    variant.description = format!("variant of {}", base.description);
    variant.weight = (base.weight * rng.gen_range(0.5..=1.0)).clamp(0.0, 1.0);
    Ok(variant)
}
