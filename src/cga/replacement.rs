//! Distance-biased replacement of the working population.
//!
//! Shrinks the working population back to `population_size`, preferring
//! individuals close to, but not coincident with, the archive.
//!
//! 1. **Nearest per archive point**: every archive point claims its
//!    nearest non-coincident individual from the pool. When at least
//!    `population_size` were claimed, a tournament without replacement
//!    picks exactly `population_size` of them; otherwise all are kept.
//! 2. **Fill**: remaining slots are filled by the same tournament over the
//!    unclaimed individuals, scored by their distance to the closest
//!    archive point. Individuals coinciding with an archive point never
//!    qualify.
//!
//! The result may be smaller than `population_size` when too few
//! non-coincident candidates exist; nothing is padded.

use super::selection::dynamic_tournament_width;
use super::types::Individual;
use crate::random::uniform_index;
use rand::Rng;

/// Distances below twice the smallest positive `f64` count as coincident.
pub fn is_coincident(distance: f64) -> bool {
    distance.abs() < 2.0 * f64::from_bits(1)
}

/// Distance-biased downsizing filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplacementFilter {
    population_size: usize,
    tournament_proportion: f64,
}

impl ReplacementFilter {
    /// `tournament_proportion` is the tournament width as a percentage of
    /// the remaining candidates.
    pub fn new(population_size: usize, tournament_proportion: f64) -> Self {
        Self {
            population_size,
            tournament_proportion,
        }
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Selects the next working population from `population`.
    pub fn apply<S, R: Rng>(
        &self,
        mut population: Vec<Individual<S>>,
        archive: &[Individual<S>],
        rng: &mut R,
    ) -> Vec<Individual<S>> {
        let mut claimed: Vec<(Individual<S>, f64)> = Vec::with_capacity(archive.len());
        for point in archive {
            let mut nearest: Option<(usize, f64)> = None;
            for (i, ind) in population.iter().enumerate() {
                let d = ind.distance_to(point);
                if !is_coincident(d) && nearest.map_or(true, |(_, best)| d < best) {
                    nearest = Some((i, d));
                }
            }
            if let Some((i, d)) = nearest {
                claimed.push((population.remove(i), d));
            }
        }

        let mut selected = if claimed.len() >= self.population_size {
            self.draw(&mut claimed, self.population_size, rng)
        } else {
            claimed.into_iter().map(|(ind, _)| ind).collect()
        };

        let slots = self.population_size.saturating_sub(selected.len());
        if slots > 0 {
            let mut pool: Vec<(Individual<S>, f64)> = population
                .into_iter()
                .filter_map(|ind| {
                    let d = archive
                        .iter()
                        .map(|a| ind.distance_to(a))
                        .fold(f64::MAX, f64::min);
                    (!is_coincident(d)).then_some((ind, d))
                })
                .collect();
            selected.extend(self.draw(&mut pool, slots, rng));
        }

        selected
    }

    /// Tournament without replacement: up to `draws` winners, smaller
    /// distance wins each head-to-head. Stops early on an exhausted pool.
    fn draw<S, R: Rng>(
        &self,
        pool: &mut Vec<(Individual<S>, f64)>,
        draws: usize,
        rng: &mut R,
    ) -> Vec<Individual<S>> {
        let mut winners = Vec::with_capacity(draws.min(pool.len()));
        for _ in 0..draws {
            if pool.is_empty() {
                break;
            }
            let remaining = pool.len();
            let width = dynamic_tournament_width(self.tournament_proportion, remaining);
            let mut chosen = uniform_index(remaining, rng);
            for _ in 1..width {
                let other = uniform_index(remaining, rng);
                if pool[other].1 < pool[chosen].1 {
                    chosen = other;
                }
            }
            winners.push(pool.remove(chosen).0);
        }
        winners
    }
}
