//! Clustered GA configuration.
//!
//! [`CgaConfig`] is the single immutable aggregate handed to the runner;
//! every collaborator reads its parameters from here.

use super::clustering::{ClusterWeight, Clusterer, ClusteringParams};
use super::exclusion::ExclusionPolicy;
use super::operators::{Crossover, InitialPopulation, Mutation};
use super::quality::QualityMeasures;
use super::schedule::TournamentSchedule;
use crate::error::CgaError;
use std::path::PathBuf;

/// Configuration for the clustered GA.
///
/// # Defaults
///
/// ```
/// use u_cga::cga::CgaConfig;
///
/// let config = CgaConfig::default();
/// assert_eq!(config.population_size, 50);
/// assert_eq!(config.evaluation_budget, 10_000);
/// assert_eq!(config.offspring_pairs(), 25);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_cga::cga::{CgaConfig, ExclusionPolicy};
///
/// let config = CgaConfig::default()
///     .with_population_size(40)
///     .with_evaluation_budget(2_000)
///     .with_cluster_count(4)
///     .with_exclusion(ExclusionPolicy::UsageThreshold { usage_limit: 5, duration: 3 })
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CgaConfig {
    /// Size of the working population after replacement.
    pub population_size: usize,

    /// Evaluation budget; the run stops once this many evaluations were spent.
    ///
    /// The initial population counts toward it.
    pub evaluation_budget: usize,

    /// Offspring pairs per generation.
    ///
    /// `None` uses `max(1, population_size / 2)`.
    pub offspring_pairs: Option<usize>,

    /// Probability of crossing the route segment (0.0–1.0).
    pub route_crossover_rate: f64,

    /// Probability of crossing the selection segment (0.0–1.0).
    pub selection_crossover_rate: f64,

    /// Route mutation probability (0.0–1.0); its meaning depends on [`Mutation`].
    pub route_mutation_rate: f64,

    /// Per-flag mutation probability (0.0–1.0).
    pub selection_mutation_rate: f64,

    pub crossover: Crossover,
    pub mutation: Mutation,
    pub initial_population: InitialPopulation,

    pub clusterer: Clusterer,

    /// Requested number of clusters; capped by the archive size.
    pub cluster_count: usize,

    /// Iteration limit of the clusterer.
    pub cluster_iterations: usize,

    /// Dispersion bonus for clusters holding an extreme point.
    pub edge_dispersion: f64,

    pub cluster_weight: ClusterWeight,

    /// Tournament parameter at the start of the run (percent).
    pub max_tournament_size: f64,

    /// Tournament parameter the schedule decays towards (percent).
    pub min_tournament_size: f64,

    /// Exponential decay constant of the schedule.
    pub tournament_decay: f64,

    /// Fixed tournament proportion for replacement (percent).
    ///
    /// `None` uses the scheduled tournament parameter.
    pub replacement_tournament: Option<f64>,

    /// Exclusion entry policy; disabled by default.
    pub exclusion: ExclusionPolicy,

    /// Whether to build and evaluate chromosomes (initial population and
    /// offspring) in parallel using rayon.
    pub parallel: bool,

    /// Random seed for reproducibility.
    ///
    /// `None` uses a random seed.
    pub seed: Option<u64>,

    /// Directory for diagnostic files. `None` disables them.
    pub report_dir: Option<PathBuf>,

    /// Suffix of the diagnostic file names.
    pub run_index: usize,

    /// Inputs of the per-generation quality measures.
    pub quality: QualityMeasures,
}

impl Default for CgaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            evaluation_budget: 10_000,
            offspring_pairs: None,
            route_crossover_rate: 0.8,
            selection_crossover_rate: 0.95,
            route_mutation_rate: 0.4,
            selection_mutation_rate: 0.01,
            crossover: Crossover::default(),
            mutation: Mutation::default(),
            initial_population: InitialPopulation::default(),
            clusterer: Clusterer::default(),
            cluster_count: 2,
            cluster_iterations: 50,
            edge_dispersion: 4.0,
            cluster_weight: ClusterWeight::default(),
            max_tournament_size: 150.0,
            min_tournament_size: 10.0,
            tournament_decay: 5.0,
            replacement_tournament: Some(100.0),
            exclusion: ExclusionPolicy::default(),
            parallel: true,
            seed: None,
            report_dir: None,
            run_index: 0,
            quality: QualityMeasures::default(),
        }
    }
}

impl CgaConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the evaluation budget.
    pub fn with_evaluation_budget(mut self, budget: usize) -> Self {
        self.evaluation_budget = budget;
        self
    }

    /// Sets the number of offspring pairs per generation.
    pub fn with_offspring_pairs(mut self, pairs: usize) -> Self {
        self.offspring_pairs = Some(pairs);
        self
    }

    /// Sets route and selection crossover rates.
    pub fn with_crossover_rates(mut self, route: f64, selection: f64) -> Self {
        self.route_crossover_rate = route.clamp(0.0, 1.0);
        self.selection_crossover_rate = selection.clamp(0.0, 1.0);
        self
    }

    /// Sets route and selection mutation rates.
    pub fn with_mutation_rates(mut self, route: f64, selection: f64) -> Self {
        self.route_mutation_rate = route.clamp(0.0, 1.0);
        self.selection_mutation_rate = selection.clamp(0.0, 1.0);
        self
    }

    pub fn with_crossover(mut self, crossover: Crossover) -> Self {
        self.crossover = crossover;
        self
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_initial_population(mut self, initial: InitialPopulation) -> Self {
        self.initial_population = initial;
        self
    }

    /// Sets the requested cluster count.
    pub fn with_cluster_count(mut self, k: usize) -> Self {
        self.cluster_count = k;
        self
    }

    /// Sets the clusterer iteration limit.
    pub fn with_cluster_iterations(mut self, n: usize) -> Self {
        self.cluster_iterations = n;
        self
    }

    /// Sets the dispersion bonus of edge clusters.
    pub fn with_edge_dispersion(mut self, bonus: f64) -> Self {
        self.edge_dispersion = bonus;
        self
    }

    pub fn with_cluster_weight(mut self, weight: ClusterWeight) -> Self {
        self.cluster_weight = weight;
        self
    }

    /// Sets the tournament schedule bounds and decay constant.
    pub fn with_tournament_schedule(mut self, min: f64, max: f64, decay: f64) -> Self {
        self.min_tournament_size = min;
        self.max_tournament_size = max;
        self.tournament_decay = decay;
        self
    }

    /// Sets a fixed replacement tournament proportion, or `None` to follow
    /// the schedule.
    pub fn with_replacement_tournament(mut self, proportion: Option<f64>) -> Self {
        self.replacement_tournament = proportion;
        self
    }

    pub fn with_exclusion(mut self, policy: ExclusionPolicy) -> Self {
        self.exclusion = policy;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables diagnostic files in `dir`, suffixed with `run_index`.
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>, run_index: usize) -> Self {
        self.report_dir = Some(dir.into());
        self.run_index = run_index;
        self
    }

    pub fn with_quality(mut self, quality: QualityMeasures) -> Self {
        self.quality = quality;
        self
    }

    /// Effective offspring pairs per generation.
    pub fn offspring_pairs(&self) -> usize {
        self.offspring_pairs
            .unwrap_or(self.population_size / 2)
            .max(1)
    }

    pub fn tournament_schedule(&self) -> TournamentSchedule {
        TournamentSchedule::new(
            self.min_tournament_size,
            self.max_tournament_size,
            self.tournament_decay,
        )
    }

    pub fn clustering_params(&self) -> ClusteringParams {
        ClusteringParams {
            cluster_count: self.cluster_count,
            iteration_limit: self.cluster_iterations,
            edge_dispersion: self.edge_dispersion,
            weight: self.cluster_weight,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// [`CgaError::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<(), CgaError> {
        let invalid = |msg: &str| Err(CgaError::InvalidConfig(msg.into()));

        if self.population_size < 2 {
            return invalid("population_size must be at least 2");
        }
        if self.evaluation_budget == 0 {
            return invalid("evaluation_budget must be at least 1");
        }
        if self.evaluation_budget < self.population_size {
            return invalid("evaluation_budget must cover the initial population");
        }
        if self.offspring_pairs == Some(0) {
            return invalid("offspring_pairs must be positive or None");
        }
        if self.cluster_count == 0 {
            return invalid("cluster_count must be at least 1");
        }
        let rates = [
            self.route_crossover_rate,
            self.selection_crossover_rate,
            self.route_mutation_rate,
            self.selection_mutation_rate,
        ];
        if rates.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return invalid("operator rates must lie in [0, 1]");
        }
        let InitialPopulation::Random { selection_density } = self.initial_population;
        if !(0.0..=1.0).contains(&selection_density) {
            return invalid("selection_density must lie in [0, 1]");
        }
        if !(self.min_tournament_size.is_finite() && self.max_tournament_size.is_finite()) {
            return invalid("tournament sizes must be finite");
        }
        if self.min_tournament_size > self.max_tournament_size {
            return invalid("min_tournament_size must not exceed max_tournament_size");
        }
        if self.tournament_decay.is_nan() || self.tournament_decay < 0.0 {
            return invalid("tournament_decay must be non-negative");
        }
        if let ExclusionPolicy::UsageThreshold { duration: 0, .. } = self.exclusion {
            return invalid("exclusion duration must be at least 1");
        }
        if let (Some(nadir), Some(front)) = (&self.quality.nadir, &self.quality.reference_front) {
            if front.arity().is_some_and(|arity| arity != nadir.len()) {
                return invalid("nadir point and reference front differ in arity");
            }
        }
        Ok(())
    }
}
