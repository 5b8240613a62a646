//! Core types for the clustered GA.
//!
//! [`CgaProblem`] is the contract between the generic engine and a
//! concrete coupled routing + selection problem. [`Individual`] is the
//! record the engine moves between the archive, the exclusion pool and the
//! working population.

use super::archive::dominates;

/// Split of a chromosome into a route segment followed by a selection segment.
///
/// The route segment `genes[..route_len]` is a permutation of
/// `0..route_len`. The selection segment `genes[route_len..]` holds `0/1`
/// flags, one per selectable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneLayout {
    /// Number of route genes.
    pub route_len: usize,
    /// Number of selection flags.
    pub selection_len: usize,
}

impl GeneLayout {
    /// Creates a layout.
    pub fn new(route_len: usize, selection_len: usize) -> Self {
        Self {
            route_len,
            selection_len,
        }
    }

    /// Total chromosome length.
    pub fn len(&self) -> usize {
        self.route_len + self.selection_len
    }

    /// Whether the chromosome has no genes at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the first selection gene.
    pub fn split_point(&self) -> usize {
        self.route_len
    }

    /// Checks that `genes` respects this layout.
    pub fn is_valid(&self, genes: &[usize]) -> bool {
        if genes.len() != self.len() {
            return false;
        }
        let mut seen = vec![false; self.route_len];
        for &g in &genes[..self.route_len] {
            if g >= self.route_len || seen[g] {
                return false;
            }
            seen[g] = true;
        }
        genes[self.route_len..].iter().all(|&g| g <= 1)
    }
}

/// Defines a bi-objective problem for the clustered GA.
///
/// The engine never looks inside [`Solution`](CgaProblem::Solution); it
/// only asks the problem to build one from genes and to score it.
/// All objectives are **minimized**.
///
/// # Implementing
///
/// ```ignore
/// impl CgaProblem for Ttp {
///     type Solution = Plan;
///     fn layout(&self) -> GeneLayout { GeneLayout::new(self.cities, self.items) }
///     fn build_solution(&self, genes: &[usize]) -> Plan { Plan::decode(self, genes) }
///     fn evaluate(&self, plan: &Plan) -> Vec<f64> { vec![plan.time, -plan.profit] }
/// }
/// ```
pub trait CgaProblem: Send + Sync {
    /// Derived solution state built from genes.
    type Solution: Clone + Send + Sync;

    /// Chromosome layout shared by every individual.
    fn layout(&self) -> GeneLayout;

    /// Builds the solution state for a chromosome.
    fn build_solution(&self, genes: &[usize]) -> Self::Solution;

    /// Computes the objective vector of a solution. Fixed arity.
    fn evaluate(&self, solution: &Self::Solution) -> Vec<f64>;

    /// Normalizes an objective vector for reporting.
    ///
    /// The default returns the objectives unchanged.
    fn normalize(&self, objectives: &[f64]) -> Vec<f64> {
        objectives.to_vec()
    }
}

/// Usage statistics of an archive member acting as a parent.
///
/// The adjusted counters restart whenever the individual is excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub usage: u32,
    pub adjusted_usage: u32,
    pub unsuccessful: u32,
    pub adjusted_unsuccessful: u32,
}

/// Exclusion bookkeeping. `generation_counter == 0` means active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusionState {
    pub times_excluded: u32,
    pub generation_counter: u32,
}

/// A candidate solution.
///
/// Individuals are identified by gene equality for deduplication; the
/// `id` only links offspring back to their parents across a generation.
#[derive(Debug, Clone)]
pub struct Individual<S> {
    id: u64,
    genes: Vec<usize>,
    solution: S,
    objectives: Vec<f64>,
    normalized: Vec<f64>,
    usage: UsageCounters,
    exclusion: ExclusionState,
}

impl<S> Individual<S> {
    /// Builds the solution for `genes` and evaluates it.
    pub fn new<P>(problem: &P, id: u64, genes: Vec<usize>) -> Self
    where
        P: CgaProblem<Solution = S>,
    {
        let solution = problem.build_solution(&genes);
        let objectives = problem.evaluate(&solution);
        let normalized = problem.normalize(&objectives);
        Self::from_parts(id, genes, solution, objectives, normalized)
    }

    /// Assembles an already evaluated individual.
    pub fn from_parts(
        id: u64,
        genes: Vec<usize>,
        solution: S,
        objectives: Vec<f64>,
        normalized: Vec<f64>,
    ) -> Self {
        Self {
            id,
            genes,
            solution,
            objectives,
            normalized,
            usage: UsageCounters::default(),
            exclusion: ExclusionState::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    pub fn solution(&self) -> &S {
        &self.solution
    }

    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    pub fn normalized_objectives(&self) -> &[f64] {
        &self.normalized
    }

    pub fn usage(&self) -> UsageCounters {
        self.usage
    }

    pub fn exclusion(&self) -> ExclusionState {
        self.exclusion
    }

    /// Whether this individual is currently quarantined.
    pub fn is_excluded(&self) -> bool {
        self.exclusion.generation_counter > 0
    }

    /// Pareto dominance on the objective vectors (minimization).
    pub fn dominates(&self, other: &Self) -> bool {
        dominates(&self.objectives, &other.objectives)
    }

    /// Exact element-wise gene equality.
    pub fn same_genes(&self, other: &Self) -> bool {
        self.genes == other.genes
    }

    /// Sum of the objectives, used as a scalar tie-breaker.
    pub fn objective_sum(&self) -> f64 {
        self.objectives.iter().sum()
    }

    /// Euclidean distance between objective vectors.
    pub fn distance_to(&self, other: &Self) -> f64 {
        objective_distance(&self.objectives, &other.objectives)
    }

    /// Counts one selection as a parent.
    pub fn record_usage(&mut self) {
        self.usage.usage += 1;
        self.usage.adjusted_usage += 1;
    }

    /// Counts one parent usage whose offspring all failed to enter the archive.
    pub fn record_unsuccessful_usage(&mut self) {
        self.usage.unsuccessful += 1;
        self.usage.adjusted_unsuccessful += 1;
    }

    /// Moves the individual into the excluded state for `generations` countdown steps.
    pub fn exclude(&mut self, generations: u32) {
        self.exclusion.times_excluded += 1;
        self.exclusion.generation_counter = generations;
        self.usage.adjusted_usage = 0;
        self.usage.adjusted_unsuccessful = 0;
    }

    /// Decrements the exclusion countdown and returns what is left.
    pub(crate) fn count_down_exclusion(&mut self) -> u32 {
        self.exclusion.generation_counter = self.exclusion.generation_counter.saturating_sub(1);
        self.exclusion.generation_counter
    }
}

/// Euclidean distance between two objective vectors.
pub fn objective_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sum;

    impl CgaProblem for Sum {
        type Solution = usize;
        fn layout(&self) -> GeneLayout {
            GeneLayout::new(3, 2)
        }
        fn build_solution(&self, genes: &[usize]) -> usize {
            genes.iter().sum()
        }
        fn evaluate(&self, s: &usize) -> Vec<f64> {
            vec![*s as f64, -(*s as f64)]
        }
        fn normalize(&self, objectives: &[f64]) -> Vec<f64> {
            objectives.iter().map(|o| o / 10.0).collect()
        }
    }

    #[test]
    fn test_new_builds_and_evaluates() {
        let ind = Individual::new(&Sum, 7, vec![2, 0, 1, 1, 0]);
        assert_eq!(ind.id(), 7);
        assert_eq!(*ind.solution(), 4);
        assert_eq!(ind.objectives(), &[4.0, -4.0]);
        assert_eq!(ind.normalized_objectives(), &[0.4, -0.4]);
    }

    #[test]
    fn test_layout_validity() {
        let layout = GeneLayout::new(3, 2);
        assert!(layout.is_valid(&[2, 0, 1, 1, 0]));
        assert!(!layout.is_valid(&[2, 2, 1, 1, 0]));
        assert!(!layout.is_valid(&[2, 0, 1, 2, 0]));
        assert!(!layout.is_valid(&[2, 0, 1, 1]));
        assert_eq!(layout.split_point(), 3);
    }

    #[test]
    fn test_exclusion_resets_adjusted_counters() {
        let mut ind = Individual::from_parts(0, vec![0], (), vec![1.0], vec![1.0]);
        ind.record_usage();
        ind.record_unsuccessful_usage();
        ind.exclude(3);

        let usage = ind.usage();
        assert_eq!(usage.usage, 1);
        assert_eq!(usage.adjusted_usage, 0);
        assert_eq!(usage.unsuccessful, 1);
        assert_eq!(usage.adjusted_unsuccessful, 0);
        assert!(ind.is_excluded());
        assert_eq!(ind.exclusion().times_excluded, 1);

        assert_eq!(ind.count_down_exclusion(), 2);
        assert_eq!(ind.count_down_exclusion(), 1);
        assert_eq!(ind.count_down_exclusion(), 0);
        assert!(!ind.is_excluded());
    }

    #[test]
    fn test_distance() {
        let a = Individual::from_parts(0, vec![0], (), vec![0.0, 0.0], vec![]);
        let b = Individual::from_parts(1, vec![1], (), vec![3.0, 4.0], vec![]);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
