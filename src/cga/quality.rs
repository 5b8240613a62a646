//! Archive quality measures.
//!
//! Purely diagnostic: the optimizer records these every generation but
//! never branches on them.
//!
//! - [`hypervolume`]: volume dominated by a point set up to a nadir point
//! - [`inverted_generational_distance`]: mean distance from each reference
//!   point to the closest archive point
//! - [`reference_front_distance`]: mean distance from each archive point
//!   to the closest reference point
//!
//! # References
//!
//! - Zitzler & Thiele (1998), "Multiobjective Optimization Using
//!   Evolutionary Algorithms: A Comparative Case Study"
//! - While et al. (2006), "A Faster Algorithm for Calculating Hypervolume"
//! - Coello Coello & Reyes Sierra (2004), "A Study of the Parallelization of
//!   a Coevolutionary Multi-objective Evolutionary Algorithm"

use super::types::{objective_distance, Individual};
use crate::error::{CgaError, Result};
use std::path::Path;
use std::str::FromStr;

/// Known (approximate) Pareto front used as a quality reference.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceFront {
    points: Vec<Vec<f64>>,
}

impl ReferenceFront {
    pub fn new(points: Vec<Vec<f64>>) -> Self {
        Self { points }
    }

    /// Reads a front from a `;`-separated file.
    ///
    /// # Errors
    /// [`CgaError::Io`] if the file cannot be read, [`CgaError::ReferenceFront`]
    /// on the first malformed line.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        std::fs::read_to_string(path)?.parse()
    }

    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Objective count of the front, if it has any point.
    pub fn arity(&self) -> Option<usize> {
        self.points.first().map(Vec::len)
    }
}

impl FromStr for ReferenceFront {
    type Err = CgaError;

    /// One point per line, objectives separated by `;`. Blank lines are
    /// skipped; every other line must parse completely and all points
    /// must share one arity.
    fn from_str(s: &str) -> Result<Self> {
        let mut points: Vec<Vec<f64>> = Vec::new();
        for (i, line) in s.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let malformed = || CgaError::ReferenceFront {
                line: i + 1,
                content: line.to_string(),
            };
            let point = trimmed
                .split(';')
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| v.parse::<f64>().map_err(|_| malformed()))
                .collect::<Result<Vec<f64>>>()?;
            if point.is_empty() || points.first().is_some_and(|p| p.len() != point.len()) {
                return Err(malformed());
            }
            points.push(point);
        }
        Ok(Self { points })
    }
}

/// Quality-measure inputs for a run.
///
/// A measure whose input is missing reports `NaN`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualityMeasures {
    /// Reference point for the hypervolume.
    pub nadir: Option<Vec<f64>>,
    /// Reference front for IGD and reference-front distance.
    pub reference_front: Option<ReferenceFront>,
}

/// Quality of the archive at one point of the run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualitySample {
    pub cost: usize,
    pub hypervolume: f64,
    pub igd: f64,
    pub reference_distance: f64,
}

impl QualityMeasures {
    /// Measures `archive` after `cost` evaluations.
    pub fn sample<S>(&self, cost: usize, archive: &[Individual<S>]) -> QualitySample {
        let points: Vec<Vec<f64>> = archive.iter().map(|i| i.objectives().to_vec()).collect();
        let front = self.reference_front.as_ref().map(ReferenceFront::points);
        QualitySample {
            cost,
            hypervolume: self
                .nadir
                .as_ref()
                .map_or(f64::NAN, |nadir| hypervolume(&points, nadir)),
            igd: front.map_or(f64::NAN, |f| inverted_generational_distance(&points, f)),
            reference_distance: front.map_or(f64::NAN, |f| reference_front_distance(&points, f)),
        }
    }
}

/// Exact hypervolume of `points` relative to `reference` (minimization).
///
/// Points not strictly better than `reference` in every objective add
/// nothing. Uses a sweep in two dimensions and slicing by the last
/// objective above that.
///
/// ```
/// use u_cga::cga::quality::hypervolume;
///
/// let front = vec![vec![1.0, 3.0], vec![2.0, 2.0], vec![3.0, 1.0]];
/// assert!((hypervolume(&front, &[4.0, 4.0]) - 6.0).abs() < 1e-12);
/// ```
pub fn hypervolume(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let inside: Vec<&[f64]> = points
        .iter()
        .map(Vec::as_slice)
        .filter(|p| p.len() == reference.len() && p.iter().zip(reference).all(|(v, r)| v < r))
        .collect();
    slice_volume(inside, reference)
}

fn slice_volume(mut points: Vec<&[f64]>, reference: &[f64]) -> f64 {
    let d = reference.len();
    if points.is_empty() || d == 0 {
        return 0.0;
    }
    if d == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return reference[0] - best;
    }

    let last = d - 1;
    points.sort_by(|a, b| a[last].partial_cmp(&b[last]).unwrap_or(std::cmp::Ordering::Equal));

    if d == 2 {
        let mut volume = 0.0;
        let mut floor = reference[0];
        // Ascending in the second objective: each point adds the strip it
        // improves in the first objective.
        for p in &points {
            if p[0] < floor {
                volume += (floor - p[0]) * (reference[1] - p[1]);
                floor = p[0];
            }
        }
        return volume;
    }

    let mut volume = 0.0;
    for i in 0..points.len() {
        let upper = points.get(i + 1).map_or(reference[last], |p| p[last]);
        let depth = upper - points[i][last];
        if depth > 0.0 {
            let projected: Vec<&[f64]> = points[..=i].iter().map(|p| &p[..last]).collect();
            volume += depth * slice_volume(projected, &reference[..last]);
        }
    }
    volume
}

/// Mean over `front` of the distance to the nearest point in `points`.
///
/// `NaN` if either set is empty.
pub fn inverted_generational_distance(points: &[Vec<f64>], front: &[Vec<f64>]) -> f64 {
    mean_nearest_distance(front, points)
}

/// Mean over `points` of the distance to the nearest point in `front`.
///
/// `NaN` if either set is empty.
pub fn reference_front_distance(points: &[Vec<f64>], front: &[Vec<f64>]) -> f64 {
    mean_nearest_distance(points, front)
}

fn mean_nearest_distance(from: &[Vec<f64>], to: &[Vec<f64>]) -> f64 {
    if from.is_empty() || to.is_empty() {
        return f64::NAN;
    }
    let total: f64 = from
        .iter()
        .map(|p| {
            to.iter()
                .map(|q| objective_distance(p, q))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    total / from.len() as f64
}
