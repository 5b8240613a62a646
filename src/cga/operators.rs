//! Variation operators and initial-population generation.
//!
//! All operators work on a coupled chromosome described by a
//! [`GeneLayout`]: a permutation route segment followed by `0/1` selection
//! flags. Every operator takes two probabilities: probability A governs
//! the route segment, probability B the selection segment.
//!
//! # Crossover variants
//!
//! - [`Crossover::OrderUniform`]: OX on the route (Davis, 1985), uniform
//!   crossover on the flags
//! - [`Crossover::PartiallyMappedSinglePoint`]: PMX on the route
//!   (Goldberg & Lingle, 1985), one-point crossover on the flags
//!
//! # Mutation variants
//!
//! - [`Mutation::InvertFlip`]: one 2-opt segment reversal with probability
//!   A, independent flag flips with probability B
//! - [`Mutation::SwapFlip`]: each route position swapped with probability
//!   A, independent flag flips with probability B

use super::types::{CgaProblem, GeneLayout, Individual};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

// ============================================================================
// Crossover
// ============================================================================

/// Crossover variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Crossover {
    #[default]
    OrderUniform,
    PartiallyMappedSinglePoint,
}

impl Crossover {
    /// Produces two children from two parents.
    ///
    /// Each segment is recombined with its own probability; otherwise the
    /// children inherit that segment unchanged from their own parent.
    ///
    /// # Panics
    /// Panics if the parents do not match `layout`'s length.
    pub fn apply<R: Rng>(
        &self,
        layout: GeneLayout,
        first: &[usize],
        second: &[usize],
        route_rate: f64,
        selection_rate: f64,
        rng: &mut R,
    ) -> (Vec<usize>, Vec<usize>) {
        assert_eq!(first.len(), layout.len(), "parent does not match layout");
        assert_eq!(second.len(), layout.len(), "parent does not match layout");

        let split = layout.split_point();
        let mut child_a = first.to_vec();
        let mut child_b = second.to_vec();

        if layout.route_len > 1 && rng.random_bool(route_rate) {
            let (ra, rb) = match self {
                Crossover::OrderUniform => order_crossover(&first[..split], &second[..split], rng),
                Crossover::PartiallyMappedSinglePoint => {
                    pmx_crossover(&first[..split], &second[..split], rng)
                }
            };
            child_a[..split].copy_from_slice(&ra);
            child_b[..split].copy_from_slice(&rb);
        }

        if layout.selection_len > 0 && rng.random_bool(selection_rate) {
            let (fa, fb) = (&mut child_a[split..], &mut child_b[split..]);
            match self {
                Crossover::OrderUniform => {
                    for (a, b) in fa.iter_mut().zip(fb.iter_mut()) {
                        if rng.random_bool(0.5) {
                            std::mem::swap(a, b);
                        }
                    }
                }
                Crossover::PartiallyMappedSinglePoint => {
                    let point = rng.random_range(0..layout.selection_len);
                    fa[point..].swap_with_slice(&mut fb[point..]);
                }
            }
        }

        (child_a, child_b)
    }
}

/// Order Crossover (OX) for permutations.
///
/// Copies a random segment from one parent and fills the rest with the
/// other parent's elements in their order, wrapping after the segment.
fn order_crossover<R: Rng>(
    parent1: &[usize],
    parent2: &[usize],
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let (start, end) = random_segment(parent1.len(), rng);
    (
        ox_child(parent1, parent2, start, end),
        ox_child(parent2, parent1, start, end),
    )
}

fn ox_child(template: &[usize], donor: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = template.len();
    let mut child = vec![usize::MAX; n];
    let mut taken = vec![false; n];
    for i in start..=end {
        child[i] = template[i];
        taken[template[i]] = true;
    }

    let mut pos = (end + 1) % n;
    for offset in 0..n {
        let val = donor[(end + 1 + offset) % n];
        if !taken[val] {
            child[pos] = val;
            pos = (pos + 1) % n;
        }
    }
    child
}

/// Partially Mapped Crossover (PMX) for permutations.
///
/// Copies a random segment from one parent and places the other parent's
/// conflicting segment values through the segment's value mapping.
fn pmx_crossover<R: Rng>(
    parent1: &[usize],
    parent2: &[usize],
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let (start, end) = random_segment(parent1.len(), rng);
    (
        pmx_child(parent1, parent2, start, end),
        pmx_child(parent2, parent1, start, end),
    )
}

fn pmx_child(template: &[usize], donor: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = template.len();
    let mut position_in_donor = vec![0usize; n];
    for (i, &v) in donor.iter().enumerate() {
        position_in_donor[v] = i;
    }

    let mut child = vec![usize::MAX; n];
    let mut placed = vec![false; n];
    for i in start..=end {
        child[i] = template[i];
        placed[template[i]] = true;
    }

    for i in start..=end {
        let val = donor[i];
        if placed[val] {
            continue;
        }
        let mut pos = i;
        while (start..=end).contains(&pos) {
            pos = position_in_donor[template[pos]];
        }
        child[pos] = val;
        placed[val] = true;
    }

    for (slot, &val) in child.iter_mut().zip(donor) {
        if *slot == usize::MAX {
            *slot = val;
        }
    }
    child
}

// ============================================================================
// Mutation
// ============================================================================

/// Mutation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mutation {
    #[default]
    InvertFlip,
    SwapFlip,
}

impl Mutation {
    /// Returns a mutated copy of `genes`.
    pub fn apply<R: Rng>(
        &self,
        layout: GeneLayout,
        mut genes: Vec<usize>,
        route_rate: f64,
        selection_rate: f64,
        rng: &mut R,
    ) -> Vec<usize> {
        let split = layout.split_point();
        let route = &mut genes[..split];

        if route.len() > 1 {
            match self {
                Mutation::InvertFlip => {
                    if rng.random_bool(route_rate) {
                        let (start, end) = random_segment(route.len(), rng);
                        route[start..=end].reverse();
                    }
                }
                Mutation::SwapFlip => {
                    for i in 0..route.len() {
                        if rng.random_bool(route_rate) {
                            let j = rng.random_range(0..route.len());
                            route.swap(i, j);
                        }
                    }
                }
            }
        }

        for flag in &mut genes[split..] {
            if rng.random_bool(selection_rate) {
                *flag = 1 - (*flag).min(1);
            }
        }
        genes
    }
}

// ============================================================================
// Initial population
// ============================================================================

/// Initial-population generator variants.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitialPopulation {
    /// Shuffled route; each flag set with probability `selection_density`.
    Random { selection_density: f64 },
}

impl Default for InitialPopulation {
    fn default() -> Self {
        InitialPopulation::Random {
            selection_density: 0.5,
        }
    }
}

impl InitialPopulation {
    /// Generates `size` evaluated individuals with ids starting at `*next_id`.
    ///
    /// Genes are drawn sequentially from `rng`; solution building and
    /// evaluation run on rayon when `parallel` is set, which draws nothing
    /// from the stream.
    pub fn generate<P: CgaProblem, R: Rng>(
        &self,
        problem: &P,
        size: usize,
        next_id: &mut u64,
        parallel: bool,
        rng: &mut R,
    ) -> Vec<Individual<P::Solution>> {
        let layout = problem.layout();
        let chromosomes: Vec<(u64, Vec<usize>)> = (0..size)
            .map(|_| {
                let id = *next_id;
                *next_id += 1;
                (id, self.random_genes(layout, rng))
            })
            .collect();

        evaluate_chromosomes(problem, chromosomes, parallel)
    }

    fn random_genes<R: Rng>(&self, layout: GeneLayout, rng: &mut R) -> Vec<usize> {
        match *self {
            InitialPopulation::Random { selection_density } => {
                let mut genes: Vec<usize> = (0..layout.route_len).collect();
                genes.shuffle(rng);
                genes.extend(
                    (0..layout.selection_len).map(|_| usize::from(rng.random_bool(selection_density))),
                );
                genes
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds and evaluates `(id, genes)` chromosomes, keeping their order.
pub(crate) fn evaluate_chromosomes<P: CgaProblem>(
    problem: &P,
    chromosomes: Vec<(u64, Vec<usize>)>,
    parallel: bool,
) -> Vec<Individual<P::Solution>> {
    if parallel {
        chromosomes
            .into_par_iter()
            .map(|(id, genes)| Individual::new(problem, id, genes))
            .collect()
    } else {
        chromosomes
            .into_iter()
            .map(|(id, genes)| Individual::new(problem, id, genes))
            .collect()
    }
}

/// Pick a random segment `[start, end]` within `0..n` where `start <= end`.
fn random_segment<R: Rng>(n: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.random_range(0..n);
    let b = rng.random_range(0..n);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ============================================================================
// Tests
// ============================================================================
