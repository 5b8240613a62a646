//! Cluster-based parent selection.
//!
//! A parent pair always comes from a single cluster. The cluster is picked
//! by a dynamic tournament whose width scales with the number of clusters
//! and the scheduled tournament parameter; the winner of each head-to-head
//! is the cluster with the strictly larger dispersion. Both parents are
//! then drawn uniformly from the winning cluster.

use super::clustering::ClusteringResult;
use super::types::Individual;
use crate::error::{CgaError, Result};
use crate::random::uniform_index;
use rand::Rng;

/// Number of draws in a dynamic tournament over `candidates` entries.
///
/// `max(1, round(tournament · candidates / 100))`: the tournament parameter
/// is a percentage of the candidate count.
pub fn dynamic_tournament_width(tournament: f64, candidates: usize) -> usize {
    let width = (tournament * candidates as f64 / 100.0).round();
    if width.is_finite() && width >= 1.0 {
        width as usize
    } else {
        1
    }
}

/// Draws parent pairs from a clustered archive.
///
/// Stateless apart from the usage counters it bumps on the chosen cluster
/// and archive members.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterSelector;

impl ClusterSelector {
    /// Picks a cluster index by dynamic tournament on dispersion.
    ///
    /// # Errors
    /// [`CgaError::EmptyPopulation`] if the clustering holds no clusters.
    pub fn select_cluster<R: Rng>(
        &self,
        clustering: &ClusteringResult,
        tournament: f64,
        rng: &mut R,
    ) -> Result<usize> {
        let count = clustering.len();
        if count == 0 {
            return Err(CgaError::EmptyPopulation);
        }
        let clusters = clustering.clusters();
        let width = dynamic_tournament_width(tournament, count);

        let mut chosen = uniform_index(count, rng);
        for _ in 1..width {
            let other = uniform_index(count, rng);
            // Strict: on equal dispersion the incumbent stays.
            if clusters[other].dispersion() > clusters[chosen].dispersion() {
                chosen = other;
            }
        }
        Ok(chosen)
    }

    /// Selects a parent pair and returns their archive indices.
    ///
    /// Records a centroid usage on the chosen cluster and a usage on each
    /// chosen archive member. The two parents differ whenever the cluster
    /// has more than one member.
    ///
    /// # Errors
    /// [`CgaError::EmptyPopulation`] if the clustering holds no clusters.
    pub fn select_pair<S, R: Rng>(
        &self,
        clustering: &mut ClusteringResult,
        archive: &mut [Individual<S>],
        tournament: f64,
        rng: &mut R,
    ) -> Result<(usize, usize)> {
        let c = self.select_cluster(clustering, tournament, rng)?;
        let cluster = &mut clustering.clusters_mut()[c];
        cluster.record_centroid_usage();

        let size = cluster.len();
        if size == 0 {
            return Err(CgaError::EmptyPopulation);
        }
        let first = uniform_index(size, rng);
        let mut second = first;
        while second == first && size > 1 {
            second = uniform_index(size, rng);
        }

        let a = cluster.members()[first].index;
        let b = cluster.members()[second].index;
        archive[a].record_usage();
        archive[b].record_usage();
        Ok((a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cga::clustering::{Cluster, ClusterMember};
    use crate::random::create_rng;

    fn archive(n: usize) -> Vec<Individual<()>> {
        (0..n)
            .map(|i| Individual::from_parts(i as u64, vec![i], (), vec![i as f64], vec![]))
            .collect()
    }

    /// Clusters of the given sizes over consecutive archive indices.
    fn clustering(sizes: &[usize], dispersions: &[f64]) -> ClusteringResult {
        let mut next = 0;
        let clusters = sizes
            .iter()
            .zip(dispersions)
            .map(|(&size, &d)| {
                let members = (next..next + size)
                    .map(|index| ClusterMember { index, distance: 0.0 })
                    .collect();
                next += size;
                Cluster::new(vec![0.0], members, d)
            })
            .collect();
        ClusteringResult::new(clusters, 1)
    }

    #[test]
    fn test_width() {
        assert_eq!(dynamic_tournament_width(0.0, 10), 1);
        assert_eq!(dynamic_tournament_width(150.0, 2), 3);
        assert_eq!(dynamic_tournament_width(100.0, 7), 7);
        assert_eq!(dynamic_tournament_width(24.0, 2), 1);
        assert_eq!(dynamic_tournament_width(26.0, 2), 1);
        assert_eq!(dynamic_tournament_width(30.0, 5), 2);
        assert_eq!(dynamic_tournament_width(f64::NAN, 5), 1);
    }

    #[test]
    fn test_width_one_is_uniform() {
        let clustering = clustering(&[1, 1, 1, 1], &[0.1, 5.0, 2.0, 9.0]);
        let mut rng = create_rng(42);
        let mut counts = [0u32; 4];
        let n = 20_000;
        for _ in 0..n {
            let c = ClusterSelector.select_cluster(&clustering, 0.0, &mut rng).unwrap();
            counts[c] += 1;
        }
        for &c in &counts {
            assert!(
                (4_500..=5_500).contains(&c),
                "expected uniform, got counts: {counts:?}"
            );
        }
    }

    #[test]
    fn test_wide_tournament_favors_high_dispersion() {
        let clustering = clustering(&[1, 1, 1, 1], &[0.1, 5.0, 2.0, 9.0]);
        let mut rng = create_rng(7);
        let mut counts = [0u32; 4];
        let n = 10_000;
        for _ in 0..n {
            let c = ClusterSelector.select_cluster(&clustering, 100.0, &mut rng).unwrap();
            counts[c] += 1;
        }
        assert!(
            counts[3] > 6_000,
            "expected highest dispersion to dominate, got {counts:?}"
        );
        assert!(counts[3] > counts[1] && counts[1] > counts[0]);
    }

    #[test]
    fn test_equal_dispersion_keeps_uniformity() {
        let clustering = clustering(&[1, 1, 1, 1], &[1.0; 4]);
        let mut rng = create_rng(3);
        let mut counts = [0u32; 4];
        for _ in 0..10_000 {
            let c = ClusterSelector.select_cluster(&clustering, 100.0, &mut rng).unwrap();
            counts[c] += 1;
        }
        for &c in &counts {
            assert!(c > 2_000, "expected roughly uniform, got {counts:?}");
        }
    }

    #[test]
    fn test_pair_from_same_cluster_and_distinct() {
        let mut archive = archive(6);
        let mut clustering = clustering(&[2, 4], &[1.0, 1.0]);
        let mut rng = create_rng(11);
        for _ in 0..500 {
            let (a, b) = ClusterSelector
                .select_pair(&mut clustering, &mut archive, 50.0, &mut rng)
                .unwrap();
            assert_ne!(a, b);
            assert_eq!(a < 2, b < 2, "parents from different clusters: {a}, {b}");
        }
        let total_usage: u32 = archive.iter().map(|i| i.usage().usage).sum();
        assert_eq!(total_usage, 1_000);
        let centroid_usage: usize = clustering.clusters().iter().map(|c| c.centroid_usage()).sum();
        assert_eq!(centroid_usage, 500);
    }

    #[test]
    fn test_singleton_cluster_self_pairs() {
        let mut archive = archive(1);
        let mut clustering = clustering(&[1], &[0.0]);
        let mut rng = create_rng(5);
        let pair = ClusterSelector
            .select_pair(&mut clustering, &mut archive, 150.0, &mut rng)
            .unwrap();
        assert_eq!(pair, (0, 0));
        assert_eq!(archive[0].usage().usage, 2);
    }

    #[test]
    fn test_empty_clustering_is_error() {
        let mut archive = archive(0);
        let mut clustering = ClusteringResult::default();
        let mut rng = create_rng(5);
        let res = ClusterSelector.select_pair(&mut clustering, &mut archive, 10.0, &mut rng);
        assert!(matches!(res, Err(CgaError::EmptyPopulation)));
    }
}
