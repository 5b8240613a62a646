//! Archive maintenance: deduplication, nondominated filtering and absorption.
//!
//! The archive is a plain `Vec<Individual<S>>`. After every call in this
//! module that produces or updates an archive, its members are pairwise
//! nondominated and gene-unique.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"
//! - Knowles & Corne (2000), "Approximating the Nondominated Front Using the
//!   Pareto Archived Evolution Strategy"

use super::types::Individual;
use crate::error::{CgaError, Result};
use std::collections::HashSet;

/// Dominance comparison result.
#[derive(Debug, PartialEq)]
enum Dominance {
    /// Left dominates right.
    Left,
    /// Right dominates left.
    Right,
    /// Neither dominates the other.
    Neither,
}

/// Compare two objective vectors for Pareto dominance (minimization).
fn dominance_cmp(a: &[f64], b: &[f64]) -> Dominance {
    let mut a_better_in_some = false;
    let mut b_better_in_some = false;

    for (&va, &vb) in a.iter().zip(b.iter()) {
        if va < vb {
            a_better_in_some = true;
        } else if vb < va {
            b_better_in_some = true;
        }
    }

    match (a_better_in_some, b_better_in_some) {
        (true, false) => Dominance::Left,
        (false, true) => Dominance::Right,
        _ => Dominance::Neither,
    }
}

/// Returns `true` if `a` Pareto-dominates `b`.
///
/// Equal vectors dominate neither way.
///
/// ```
/// use u_cga::cga::archive::dominates;
///
/// assert!(dominates(&[1.0, 2.0], &[1.0, 3.0]));
/// assert!(!dominates(&[1.0, 3.0], &[3.0, 1.0]));
/// assert!(!dominates(&[2.0, 2.0], &[2.0, 2.0]));
/// ```
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    dominance_cmp(a, b) == Dominance::Left
}

/// Collapses gene-identical individuals, keeping the first occurrence.
///
/// Objective values play no part: a later copy with stale objectives is
/// dropped regardless.
pub fn remove_duplicates<S>(individuals: Vec<Individual<S>>) -> Vec<Individual<S>> {
    let mut seen: HashSet<Vec<usize>> = HashSet::with_capacity(individuals.len());
    individuals
        .into_iter()
        .filter(|ind| seen.insert(ind.genes().to_vec()))
        .collect()
}

/// Keeps the individuals not dominated by any other member of the list.
///
/// Order is preserved.
///
/// # Complexity
/// O(m * n²)
pub fn nondominated<S>(individuals: Vec<Individual<S>>) -> Vec<Individual<S>> {
    let n = individuals.len();
    let mut dominated = vec![false; n];

    for i in 0..n {
        for j in (i + 1)..n {
            match dominance_cmp(individuals[i].objectives(), individuals[j].objectives()) {
                Dominance::Left => dominated[j] = true,
                Dominance::Right => dominated[i] = true,
                Dominance::Neither => {}
            }
        }
    }

    individuals
        .into_iter()
        .zip(dominated)
        .filter_map(|(ind, d)| (!d).then_some(ind))
        .collect()
}

/// Absorbs `candidates` into `archive` in place.
///
/// Candidates are processed in input order. A candidate is added when no
/// archive member has the same genes and none dominates it; every member it
/// dominates is removed at that point. Because `candidates` is a separate
/// borrow, it may hold clones of current archive members; those are
/// rejected as duplicates.
///
/// Returns the number of candidates added.
pub fn absorb<S: Clone>(archive: &mut Vec<Individual<S>>, candidates: &[Individual<S>]) -> usize {
    let mut added = 0;
    for candidate in candidates {
        if archive.iter().any(|a| a.same_genes(candidate)) {
            continue;
        }
        if archive.iter().any(|a| a.dominates(candidate)) {
            continue;
        }
        archive.retain(|a| !candidate.dominates(a));
        archive.push(candidate.clone());
        added += 1;
    }
    added
}

/// Returns the individual with the smallest objective sum.
///
/// # Errors
/// [`CgaError::EmptyPopulation`] if `population` is empty.
pub fn find_best<S>(population: &[Individual<S>]) -> Result<&Individual<S>> {
    population
        .iter()
        .min_by(|a, b| {
            a.objective_sum()
                .partial_cmp(&b.objective_sum())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(CgaError::EmptyPopulation)
}

// ============================================================================
// Tests
// ============================================================================
