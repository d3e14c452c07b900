//! Parent-chain index over a set of genomes.
//!
//! Lineage must form a forest: every chain of `parent_id` links ends at a
//! seed in finitely many hops. The index detects cycles and gaps instead
//! of looping on them.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::genome::GoalGenome;
use crate::ids::GenomeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineageError {
    #[error("genome not indexed: {0}")]
    UnknownGenome(GenomeId),

    #[error("lineage cycle detected at genome {0}")]
    Cycle(GenomeId),

    #[error("genome {genome} references missing ancestor {missing}")]
    MissingAncestor { genome: GenomeId, missing: GenomeId },

    #[error(
        "genome {child} generation {child_generation} does not follow parent generation \
         {parent_generation}"
    )]
    GenerationGap {
        child: GenomeId,
        child_generation: u32,
        parent_generation: u32,
    },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<GenomeId>,
    generation: u32,
}

/// Index of `genome id -> parent id` links.
#[derive(Debug, Clone, Default)]
pub struct LineageIndex {
    nodes: HashMap<GenomeId, Node>,
}

impl LineageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_genomes<'a>(genomes: impl IntoIterator<Item = &'a GoalGenome>) -> Self {
        let mut index = Self::new();
        for genome in genomes {
            index.insert(genome);
        }
        index
    }

    pub fn insert(&mut self, genome: &GoalGenome) {
        self.nodes.insert(
            genome.id.clone(),
            Node {
                parent: genome.parent_id.clone(),
                generation: genome.generation,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &GenomeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn remove(&mut self, id: &GenomeId) {
        self.nodes.remove(id);
    }

    /// Ids from `id` back to its seed, inclusive at both ends.
    pub fn trace(&self, id: &GenomeId) -> Result<Vec<GenomeId>, LineageError> {
        let mut node = self
            .nodes
            .get(id)
            .ok_or_else(|| LineageError::UnknownGenome(id.clone()))?;
        let mut chain = vec![id.clone()];
        let mut visited: HashSet<&GenomeId> = HashSet::from([id]);
        let mut current = id;

        while let Some(parent_id) = &node.parent {
            if !visited.insert(parent_id) {
                return Err(LineageError::Cycle(parent_id.clone()));
            }
            let parent = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| LineageError::MissingAncestor {
                    genome: current.clone(),
                    missing: parent_id.clone(),
                })?;
            if node.generation != parent.generation + 1 {
                return Err(LineageError::GenerationGap {
                    child: current.clone(),
                    child_generation: node.generation,
                    parent_generation: parent.generation,
                });
            }
            chain.push(parent_id.clone());
            current = parent_id;
            node = parent;
        }
        Ok(chain)
    }

    /// The seed at the end of `id`'s chain.
    pub fn root_of(&self, id: &GenomeId) -> Result<GenomeId, LineageError> {
        let chain = self.trace(id)?;
        chain
            .last()
            .cloned()
            .ok_or_else(|| LineageError::UnknownGenome(id.clone()))
    }

    /// Number of hops from `id` to its seed.
    pub fn depth(&self, id: &GenomeId) -> Result<usize, LineageError> {
        Ok(self.trace(id)?.len() - 1)
    }

    /// Check every indexed genome reaches a seed.
    pub fn verify(&self) -> Result<(), LineageError> {
        for id in self.nodes.keys() {
            self.trace(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::ObjectiveDescriptor;

    fn seed() -> GoalGenome {
        GoalGenome::seed(
            "agent",
            vec![ObjectiveDescriptor::new("o", "d", "x", 0.5)],
        )
        .unwrap()
    }

    #[test]
    fn trace_reaches_seed() {
        let s = seed();
        let c1 = s.derive_child(s.objectives.clone(), vec![]).unwrap();
        let c2 = c1.derive_child(c1.objectives.clone(), vec![]).unwrap();
        let index = LineageIndex::from_genomes([&s, &c1, &c2]);

        let chain = index.trace(&c2.id).unwrap();
        assert_eq!(chain, vec![c2.id.clone(), c1.id.clone(), s.id.clone()]);
        assert_eq!(index.root_of(&c2.id).unwrap(), s.id);
        assert_eq!(index.depth(&c2.id).unwrap(), 2);
        assert!(index.verify().is_ok());
    }

    #[test]
    fn missing_ancestor_reported() {
        let s = seed();
        let c1 = s.derive_child(s.objectives.clone(), vec![]).unwrap();
        let index = LineageIndex::from_genomes([&c1]);
        assert!(matches!(
            index.trace(&c1.id),
            Err(LineageError::MissingAncestor { missing, .. }) if missing == s.id
        ));
    }

    #[test]
    fn cycle_detected() {
        let mut a = seed();
        let mut b = seed();
        a.generation = 1;
        b.generation = 1;
        a.parent_id = Some(b.id.clone());
        b.parent_id = Some(a.id.clone());
        let index = LineageIndex::from_genomes([&a, &b]);
        assert!(index.trace(&a.id).is_err());
    }

    #[test]
    fn self_loop_detected() {
        let mut a = seed();
        a.generation = 1;
        a.parent_id = Some(a.id.clone());
        let index = LineageIndex::from_genomes([&a]);
        assert!(matches!(index.trace(&a.id), Err(LineageError::Cycle(_))));
    }

    #[test]
    fn unknown_genome() {
        let index = LineageIndex::new();
        assert!(matches!(
            index.trace(&GenomeId::new("nope")),
            Err(LineageError::UnknownGenome(_))
        ));
    }
}
