//! Niche clustering of the archive.
//!
//! A [`ClusteringResult`] partitions archive indices into non-empty
//! [`Cluster`]s, each with per-member distance to its centroid, a
//! dispersion statistic used to bias cluster selection, and a centroid
//! usage counter.
//!
//! The default [`Clusterer::KMeans`] works on min-max normalised
//! objectives and draws no random numbers: centroids are seeded at
//! quantiles of the first objective, so the run's random stream is
//! untouched by clustering.
//!
//! # References
//!
//! - Lloyd (1982), "Least squares quantization in PCM"
//! - Zhao & Karypis (2002), "Criterion functions for document clustering"

use super::types::{objective_distance, Individual};

/// Archive member inside a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMember {
    /// Index into the archive the clustering was computed on.
    pub index: usize,
    /// Distance to the cluster centroid in normalised objective space.
    pub distance: f64,
}

/// One niche of the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    centroid: Vec<f64>,
    members: Vec<ClusterMember>,
    dispersion: f64,
    centroid_usage: usize,
}

impl Cluster {
    pub fn new(centroid: Vec<f64>, members: Vec<ClusterMember>, dispersion: f64) -> Self {
        Self {
            centroid,
            members,
            dispersion,
            centroid_usage: 0,
        }
    }

    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    pub fn members(&self) -> &[ClusterMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn dispersion(&self) -> f64 {
        self.dispersion
    }

    /// How many times this cluster has been picked for parent selection.
    pub fn centroid_usage(&self) -> usize {
        self.centroid_usage
    }

    pub fn record_centroid_usage(&mut self) {
        self.centroid_usage += 1;
    }
}

/// Partition of the archive produced once per generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusteringResult {
    clusters: Vec<Cluster>,
    generation: usize,
}

impl ClusteringResult {
    pub fn new(clusters: Vec<Cluster>, generation: usize) -> Self {
        Self {
            clusters,
            generation,
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut [Cluster] {
        &mut self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn dispersions(&self) -> Vec<f64> {
        self.clusters.iter().map(Cluster::dispersion).collect()
    }
}

/// Per-cluster weight measure feeding the dispersion statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClusterWeight {
    /// Mean member distance to the centroid.
    MeanDistance,
    /// Mean member distance to the centroid divided by the mean distance
    /// from the centroid to the other centroids.
    #[default]
    WithinBetween,
}

/// Clustering parameters taken from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusteringParams {
    pub cluster_count: usize,
    pub iteration_limit: usize,
    /// Added to the dispersion of clusters holding an extreme point of
    /// any objective.
    pub edge_dispersion: f64,
    pub weight: ClusterWeight,
}

/// Clustering algorithm variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Clusterer {
    #[default]
    KMeans,
}

impl Clusterer {
    /// Clusters `archive` in objective space.
    ///
    /// Returns an empty result for an empty archive. Otherwise every
    /// archive index appears in exactly one non-empty cluster.
    pub fn cluster<S>(
        &self,
        archive: &[Individual<S>],
        params: &ClusteringParams,
        generation: usize,
    ) -> ClusteringResult {
        match self {
            Clusterer::KMeans => kmeans(archive, params, generation),
        }
    }
}

fn kmeans<S>(
    archive: &[Individual<S>],
    params: &ClusteringParams,
    generation: usize,
) -> ClusteringResult {
    let n = archive.len();
    if n == 0 {
        return ClusteringResult::new(Vec::new(), generation);
    }
    let points = normalise(archive);
    let k = params.cluster_count.clamp(1, n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .partial_cmp(&points[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut centroids: Vec<Vec<f64>> = (0..k)
        .map(|c| points[order[((2 * c + 1) * n) / (2 * k)]].clone())
        .collect();

    let mut assignment = vec![usize::MAX; n];
    for _ in 0..params.iteration_limit.max(1) {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let nearest = nearest_centroid(p, &centroids);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        for (c, centroid) in centroids.iter_mut().enumerate() {
            let assigned: Vec<&Vec<f64>> = points
                .iter()
                .zip(&assignment)
                .filter_map(|(p, &a)| (a == c).then_some(p))
                .collect();
            if assigned.is_empty() {
                continue;
            }
            for (d, value) in centroid.iter_mut().enumerate() {
                *value = assigned.iter().map(|p| p[d]).sum::<f64>() / assigned.len() as f64;
            }
        }
    }

    let extremes = extreme_indices(archive);
    let live: Vec<usize> = (0..k).filter(|c| assignment.contains(c)).collect();
    let clusters = live
        .iter()
        .map(|&c| {
            let members: Vec<ClusterMember> = (0..n)
                .filter(|&i| assignment[i] == c)
                .map(|i| ClusterMember {
                    index: i,
                    distance: objective_distance(&points[i], &centroids[c]),
                })
                .collect();
            let within = members.iter().map(|m| m.distance).sum::<f64>() / members.len() as f64;
            let mut dispersion = match params.weight {
                ClusterWeight::MeanDistance => within,
                ClusterWeight::WithinBetween => {
                    let others: Vec<f64> = live
                        .iter()
                        .filter(|&&o| o != c)
                        .map(|&o| objective_distance(&centroids[c], &centroids[o]))
                        .collect();
                    let between = others.iter().sum::<f64>() / others.len().max(1) as f64;
                    if between > 0.0 {
                        within / between
                    } else {
                        within
                    }
                }
            };
            if members.iter().any(|m| extremes.contains(&m.index)) {
                dispersion += params.edge_dispersion;
            }
            Cluster::new(centroids[c].clone(), members, dispersion)
        })
        .collect();

    ClusteringResult::new(clusters, generation)
}

/// Min-max normalised objective vectors; constant objectives map to 0.
fn normalise<S>(archive: &[Individual<S>]) -> Vec<Vec<f64>> {
    let m = archive[0].objectives().len();
    let mut lo = vec![f64::INFINITY; m];
    let mut hi = vec![f64::NEG_INFINITY; m];
    for ind in archive {
        for (d, &v) in ind.objectives().iter().enumerate() {
            lo[d] = lo[d].min(v);
            hi[d] = hi[d].max(v);
        }
    }
    archive
        .iter()
        .map(|ind| {
            ind.objectives()
                .iter()
                .enumerate()
                .map(|(d, &v)| {
                    let range = hi[d] - lo[d];
                    if range > 0.0 {
                        (v - lo[d]) / range
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dst = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = objective_distance(point, centroid);
        if d < best_dst {
            best = c;
            best_dst = d;
        }
    }
    best
}

/// Archive index of the minimum of each objective.
fn extreme_indices<S>(archive: &[Individual<S>]) -> Vec<usize> {
    let m = archive[0].objectives().len();
    (0..m)
        .filter_map(|d| {
            archive
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.objectives()[d]
                        .partial_cmp(&b.objectives()[d])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
        })
        .collect()
}
