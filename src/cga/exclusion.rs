//! Temporary exclusion of unproductive archive members.
//!
//! An excluded individual leaves the archive and waits in the
//! [`ExclusionPool`] for a fixed number of generations. Each maintenance
//! step counts every pooled individual down by one; at zero it is absorbed
//! back into the archive (and may be rejected there like any candidate).

use super::archive::absorb;
use super::types::Individual;
use tracing::trace;

/// Policy deciding which archive members enter the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExclusionPolicy {
    /// Nothing is ever excluded; maintenance only drains an empty pool.
    #[default]
    Disabled,

    /// Exclude members whose adjusted unsuccessful usage exceeds `usage_limit`.
    ///
    /// Excluded members stay out for `duration` generations (must be ≥ 1).
    UsageThreshold { usage_limit: u32, duration: u32 },
}

/// Quarantine for archive members.
#[derive(Debug, Clone)]
pub struct ExclusionPool<S> {
    members: Vec<Individual<S>>,
    total_exclusions: usize,
}

impl<S> Default for ExclusionPool<S> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            total_exclusions: 0,
        }
    }
}

impl<S: Clone> ExclusionPool<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual<S>> {
        self.members.iter()
    }

    /// Number of exclusions performed over the pool's lifetime.
    pub fn total_exclusions(&self) -> usize {
        self.total_exclusions
    }

    /// One generation of exclusion maintenance.
    ///
    /// Counts the pool down first, then applies the entry policy.
    /// Returns the number of individuals released back to the archive.
    pub fn maintain(&mut self, archive: &mut Vec<Individual<S>>, policy: &ExclusionPolicy) -> usize {
        let released = self.count_down(archive);
        if let ExclusionPolicy::UsageThreshold {
            usage_limit,
            duration,
        } = *policy
        {
            self.exclude_overused(archive, usage_limit, duration);
        }
        released
    }

    /// Decrements every countdown and returns expired individuals to the archive.
    pub fn count_down(&mut self, archive: &mut Vec<Individual<S>>) -> usize {
        let mut released = 0;
        for mut individual in std::mem::take(&mut self.members) {
            if individual.count_down_exclusion() == 0 {
                let accepted = absorb(archive, std::slice::from_ref(&individual));
                trace!(id = individual.id(), accepted, "excluded individual released");
                released += 1;
            } else {
                self.members.push(individual);
            }
        }
        released
    }

    /// Moves members with adjusted unsuccessful usage above `usage_limit` into the pool.
    ///
    /// Candidates are ordered by that counter, then by objective sum, both
    /// descending. At least one member always stays in the archive.
    /// Returns the number of individuals excluded.
    pub fn exclude_overused(
        &mut self,
        archive: &mut Vec<Individual<S>>,
        usage_limit: u32,
        duration: u32,
    ) -> usize {
        let mut chosen: Vec<usize> = archive
            .iter()
            .enumerate()
            .filter(|(_, ind)| ind.usage().adjusted_unsuccessful > usage_limit)
            .map(|(i, _)| i)
            .collect();

        chosen.sort_by(|&a, &b| {
            let (ia, ib) = (&archive[a], &archive[b]);
            ib.usage()
                .adjusted_unsuccessful
                .cmp(&ia.usage().adjusted_unsuccessful)
                .then_with(|| {
                    ib.objective_sum()
                        .partial_cmp(&ia.objective_sum())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });
        chosen.truncate(archive.len().saturating_sub(1));
        if chosen.is_empty() {
            return 0;
        }

        let mut slots: Vec<Option<Individual<S>>> =
            std::mem::take(archive).into_iter().map(Some).collect();
        for &i in &chosen {
            if let Some(mut individual) = slots[i].take() {
                individual.exclude(duration);
                trace!(id = individual.id(), duration, "archive member excluded");
                self.members.push(individual);
            }
        }
        *archive = slots.into_iter().flatten().collect();

        self.total_exclusions += chosen.len();
        chosen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cga::types::ExclusionState;

    fn ind(id: u64, objs: &[f64], unsuccessful: u32) -> Individual<()> {
        let mut ind = Individual::from_parts(id, vec![id as usize], (), objs.to_vec(), objs.to_vec());
        for _ in 0..unsuccessful {
            ind.record_unsuccessful_usage();
        }
        ind
    }

    fn front() -> Vec<Individual<()>> {
        vec![
            ind(0, &[1.0, 5.0], 0),
            ind(1, &[3.0, 3.0], 9),
            ind(2, &[5.0, 1.0], 4),
        ]
    }

    #[test]
    fn test_disabled_policy_is_noop() {
        let mut archive = front();
        let mut pool = ExclusionPool::new();
        for _ in 0..5 {
            assert_eq!(pool.maintain(&mut archive, &ExclusionPolicy::Disabled), 0);
        }
        assert!(pool.is_empty());
        assert_eq!(archive.len(), 3);
        assert_eq!(pool.total_exclusions(), 0);
    }

    #[test]
    fn test_threshold_excludes_in_order() {
        let mut archive = front();
        let mut pool = ExclusionPool::new();
        let excluded = pool.exclude_overused(&mut archive, 3, 2);
        assert_eq!(excluded, 2);
        let pooled: Vec<u64> = pool.iter().map(|i| i.id()).collect();
        assert_eq!(pooled, vec![1, 2]);
        let left: Vec<u64> = archive.iter().map(|i| i.id()).collect();
        assert_eq!(left, vec![0]);
        assert!(pool.iter().all(|i| i.exclusion().generation_counter == 2));
    }

    #[test]
    fn test_never_drains_archive() {
        let mut archive = vec![ind(0, &[1.0, 5.0], 10), ind(1, &[5.0, 1.0], 10)];
        let mut pool = ExclusionPool::new();
        pool.exclude_overused(&mut archive, 0, 3);
        assert_eq!(archive.len(), 1);
        assert_eq!(pool.len(), 1);

        pool.exclude_overused(&mut archive, 0, 3);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_tie_broken_by_objective_sum() {
        let mut archive = vec![
            ind(0, &[1.0, 2.0], 5),
            ind(1, &[4.0, 0.5], 5),
            ind(2, &[0.0, 9.0], 0),
        ];
        let mut pool = ExclusionPool::new();
        pool.exclude_overused(&mut archive, 1, 1);
        let pooled: Vec<u64> = pool.iter().map(|i| i.id()).collect();
        assert_eq!(pooled, vec![1, 0]);
    }

    #[test]
    fn test_countdown_returns_after_exactly_n_calls() {
        let n = 4;
        let mut archive = front();
        let mut pool = ExclusionPool::new();
        pool.exclude_overused(&mut archive, 8, n);
        assert_eq!(pool.len(), 1);

        for call in 1..n {
            assert_eq!(pool.count_down(&mut archive), 0, "released early at call {call}");
            assert_eq!(pool.len(), 1);
            assert!(archive.iter().all(|i| i.id() != 1));
        }

        assert_eq!(pool.count_down(&mut archive), 1);
        assert!(pool.is_empty());
        let back = archive.iter().find(|i| i.id() == 1).map(|i| i.exclusion());
        assert_eq!(
            back,
            Some(ExclusionState {
                times_excluded: 1,
                generation_counter: 0
            })
        );
    }

    #[test]
    fn test_released_individual_can_be_rejected() {
        let mut archive = front();
        let mut pool = ExclusionPool::new();
        pool.exclude_overused(&mut archive, 8, 1);
        // (2, 2) dominates the pooled (3, 3) while it is away.
        absorb(&mut archive, &[ind(9, &[2.0, 2.0], 0)]);

        assert_eq!(pool.count_down(&mut archive), 1);
        assert!(pool.is_empty());
        assert!(archive.iter().all(|i| i.id() != 1));
    }

    #[test]
    fn test_maintain_counts_down_before_excluding() {
        let mut archive = front();
        let mut pool = ExclusionPool::new();
        let policy = ExclusionPolicy::UsageThreshold {
            usage_limit: 8,
            duration: 1,
        };

        pool.maintain(&mut archive, &policy);
        assert_eq!(pool.len(), 1);

        // Released (adjusted counters were reset) and not re-excluded.
        assert_eq!(pool.maintain(&mut archive, &policy), 1);
        assert!(pool.is_empty());
        assert_eq!(archive.len(), 3);
        assert_eq!(pool.total_exclusions(), 1);
    }
}
