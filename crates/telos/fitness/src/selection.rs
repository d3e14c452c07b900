//! Tournament selection.

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;
use telos_types::{FitnessScore, GenomeId};

use crate::error::{SelectionError, SelectionResult};

/// One tournament winner.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub genome_id: GenomeId,
    pub aggregate_score: f64,
    /// Lowest aggregate score among the tournament's entrants.
    pub tournament_min: f64,
    pub entrants: Vec<GenomeId>,
}

/// Best-of-k selection over a scored pool.
#[derive(Debug, Clone)]
pub struct TournamentSelector {
    tournament_size: usize,
}

impl Default for TournamentSelector {
    fn default() -> Self {
        Self { tournament_size: 4 }
    }
}

impl TournamentSelector {
    pub fn new(tournament_size: usize) -> SelectionResult<Self> {
        if tournament_size == 0 {
            return Err(SelectionError::InvalidTournamentSize);
        }
        Ok(Self { tournament_size })
    }

    pub fn tournament_size(&self) -> usize {
        self.tournament_size
    }

    /// Run `count` tournaments and return exactly `count` winners.
    ///
    /// Entrants are drawn without replacement from a shuffled pool; when
    /// the pool runs dry it is refilled from the whole scored set. A single
    /// tournament never holds the same candidate twice. The same genome may
    /// win more than one tournament.
    pub fn select<R: Rng + ?Sized>(
        &self,
        scored: &[FitnessScore],
        count: usize,
        rng: &mut R,
    ) -> SelectionResult<Vec<Selection>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if scored.is_empty() {
            return Err(SelectionError::EmptyPool);
        }

        let size = self.tournament_size.min(scored.len());
        let mut pool: Vec<usize> = Vec::with_capacity(scored.len());
        let mut selections = Vec::with_capacity(count);

        for _ in 0..count {
            let mut entrants: Vec<usize> = Vec::with_capacity(size);
            while entrants.len() < size {
                if pool.is_empty() {
                    pool = (0..scored.len()).filter(|i| !entrants.contains(i)).collect();
                    pool.shuffle(rng);
                }
                if let Some(next) = pool.pop() {
                    if !entrants.contains(&next) {
                        entrants.push(next);
                    }
                }
            }

            let winner = entrants
                .iter()
                .copied()
                .max_by(|a, b| compare(&scored[*a], &scored[*b]))
                .unwrap_or(entrants[0]);
            let tournament_min = entrants
                .iter()
                .map(|i| scored[*i].aggregate_score)
                .fold(f64::INFINITY, f64::min);

            selections.push(Selection {
                genome_id: scored[winner].genome_id.clone(),
                aggregate_score: scored[winner].aggregate_score,
                tournament_min,
                entrants: entrants.iter().map(|i| scored[*i].genome_id.clone()).collect(),
            });
        }
        Ok(selections)
    }
}

/// Higher aggregate wins; equal scores fall back to genome id so the
/// outcome does not depend on evaluation order.
fn compare(a: &FitnessScore, b: &FitnessScore) -> Ordering {
    a.aggregate_score
        .partial_cmp(&b.aggregate_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.genome_id.cmp(&a.genome_id))
}
