//! Clustered GA generation loop.
//!
//! [`CgaRunner`] drives the run from the initial population to the final
//! archive:
//!
//! ```text
//! INIT:  generate + evaluate population → archive = nondominated(dedup(pop))
//! loop while cost < budget:
//!   exclusion maintenance → cluster archive → offspring pairs
//!   → quality sample → absorb into archive → usage bookkeeping
//!   → replacement filter
//! DONE:  archive = nondominated(dedup(archive))
//! ```
//!
//! All randomness comes from one stream in a fixed call order, so a seed
//! reproduces the run exactly, with or without parallel evaluation.

use super::archive::{absorb, find_best, nondominated, remove_duplicates};
use super::clustering::ClusteringResult;
use super::config::CgaConfig;
use super::exclusion::ExclusionPool;
use super::operators::evaluate_chromosomes;
use super::quality::QualitySample;
use super::replacement::ReplacementFilter;
use super::report::DiagnosticsWriter;
use super::selection::ClusterSelector;
use super::types::{CgaProblem, Individual};
use crate::error::{CgaError, Result};
use crate::random::create_rng;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Result of a clustered GA run.
#[derive(Debug, Clone)]
pub struct CgaResult<S> {
    /// Final archive: gene-unique and mutually nondominated.
    pub archive: Vec<Individual<S>>,

    /// Evaluations spent, initial population included.
    pub cost: usize,

    /// Number of generations executed.
    pub generations: usize,

    /// Number of exclusions performed by the exclusion policy.
    pub exclusions: usize,

    /// Archive quality sampled once per generation.
    pub quality_history: Vec<QualitySample>,
}

impl<S> CgaResult<S> {
    /// Archive member with the smallest objective sum.
    ///
    /// # Errors
    /// [`CgaError::EmptyPopulation`] if the archive is empty.
    pub fn best(&self) -> Result<&Individual<S>> {
        find_best(&self.archive)
    }
}

/// Parents and children of one offspring pair, by id.
struct Lineage {
    parents: [u64; 2],
    children: [u64; 2],
}

/// Executes the clustered GA.
///
/// # Usage
///
/// ```ignore
/// let problem = MyProblem::new();
/// let config = CgaConfig::default().with_seed(42);
/// let result = CgaRunner::run(&problem, &config)?;
/// println!("archive size: {}", result.archive.len());
/// ```
pub struct CgaRunner;

impl CgaRunner {
    /// Runs the optimizer with a stream seeded from `config.seed`.
    ///
    /// # Errors
    /// [`CgaError::InvalidConfig`] for an invalid configuration or gene layout.
    pub fn run<P: CgaProblem>(problem: &P, config: &CgaConfig) -> Result<CgaResult<P::Solution>> {
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        Self::run_with_rng(problem, config, &mut rng)
    }

    /// Runs the optimizer drawing from `rng`.
    pub fn run_with_rng<P: CgaProblem, R: Rng>(
        problem: &P,
        config: &CgaConfig,
        rng: &mut R,
    ) -> Result<CgaResult<P::Solution>> {
        config.validate()?;
        let layout = problem.layout();
        if layout.is_empty() {
            return Err(CgaError::InvalidConfig("gene layout is empty".into()));
        }

        let budget = config.evaluation_budget;
        let schedule = config.tournament_schedule();
        let params = config.clustering_params();
        let selector = ClusterSelector;
        let mut reporter = open_reporter(config);

        // 1. Initial population and archive
        let mut next_id = 0u64;
        let mut population = config.initial_population.generate(
            problem,
            config.population_size,
            &mut next_id,
            config.parallel,
            rng,
        );
        if population.is_empty() {
            return Err(CgaError::EmptyPopulation);
        }
        let mut cost = population.len();
        let mut archive = nondominated(remove_duplicates(population.clone()));

        info!(
            budget,
            population = config.population_size,
            archive = archive.len(),
            "clustered GA started"
        );

        let mut pool = ExclusionPool::new();
        let mut quality_history = Vec::new();
        let mut generation = 0usize;

        // 2. Generation loop
        while cost < budget {
            generation += 1;

            pool.maintain(&mut archive, &config.exclusion);
            let tournament = schedule.size_at_cost(cost, budget);
            let mut clustering = config.clusterer.cluster(&archive, &params, generation);

            let mut lineage = Vec::with_capacity(config.offspring_pairs());
            let mut chromosomes = Vec::with_capacity(2 * config.offspring_pairs());
            for _ in 0..config.offspring_pairs() {
                if cost >= budget {
                    break;
                }
                let (a, b) = selector.select_pair(&mut clustering, &mut archive, tournament, rng)?;
                let (first, second) = config.crossover.apply(
                    layout,
                    archive[a].genes(),
                    archive[b].genes(),
                    config.route_crossover_rate,
                    config.selection_crossover_rate,
                    rng,
                );
                for genes in [first, second] {
                    let mutated = config.mutation.apply(
                        layout,
                        genes,
                        config.route_mutation_rate,
                        config.selection_mutation_rate,
                        rng,
                    );
                    chromosomes.push((next_id, mutated));
                    next_id += 1;
                }
                lineage.push(Lineage {
                    parents: [archive[a].id(), archive[b].id()],
                    children: [next_id - 2, next_id - 1],
                });
                cost += 2;
            }
            population.extend(evaluate_chromosomes(problem, chromosomes, config.parallel));

            let sample = config.quality.sample(cost, &archive);
            quality_history.push(sample);
            if let Some(writer) = reporter.as_mut() {
                write_diagnostics(writer, &sample, &pool, &clustering);
            }

            let accepted = absorb(&mut archive, &population);
            record_unsuccessful_pairs(&mut archive, &lineage);

            let proportion = config.replacement_tournament.unwrap_or(tournament);
            population = ReplacementFilter::new(config.population_size, proportion).apply(
                population,
                &archive,
                rng,
            );

            debug!(
                generation,
                cost,
                tournament,
                clusters = clustering.len(),
                accepted,
                archive = archive.len(),
                excluded = pool.len(),
                population = population.len(),
                "generation finished"
            );
        }

        // 3. Final archive
        let archive = nondominated(remove_duplicates(archive));
        info!(
            cost,
            generations = generation,
            archive = archive.len(),
            exclusions = pool.total_exclusions(),
            "clustered GA finished"
        );

        Ok(CgaResult {
            archive,
            cost,
            generations: generation,
            exclusions: pool.total_exclusions(),
            quality_history,
        })
    }
}

/// Charges an unsuccessful usage to the parents of every pair whose
/// children all stayed out of the archive.
fn record_unsuccessful_pairs<S>(archive: &mut [Individual<S>], lineage: &[Lineage]) {
    let members: HashSet<u64> = archive.iter().map(Individual::id).collect();
    for pair in lineage {
        if pair.children.iter().any(|c| members.contains(c)) {
            continue;
        }
        for parent in archive
            .iter_mut()
            .filter(|ind| pair.parents.contains(&ind.id()))
        {
            parent.record_unsuccessful_usage();
        }
    }
}

fn open_reporter(config: &CgaConfig) -> Option<DiagnosticsWriter> {
    let dir = config.report_dir.as_ref()?;
    match DiagnosticsWriter::create(dir, config.run_index) {
        Ok(writer) => Some(writer),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "diagnostics disabled");
            None
        }
    }
}

fn write_diagnostics<S: Clone>(
    writer: &mut DiagnosticsWriter,
    sample: &QualitySample,
    pool: &ExclusionPool<S>,
    clustering: &ClusteringResult,
) {
    if let Err(e) = writer.write_quality(sample) {
        warn!(error = %e, "failed to write quality history");
    }
    if !pool.is_empty() {
        if let Err(e) = writer.write_excluded(pool) {
            warn!(error = %e, "failed to write exclusion report");
        }
    }
    if let Err(e) = writer.write_clusters(clustering) {
        warn!(error = %e, "failed to write cluster report");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cga::archive::dominates;
    use crate::cga::exclusion::ExclusionPolicy;
    use crate::cga::types::GeneLayout;

    // ---- Prize-collecting tour: shorter tour vs. larger prize ----

    struct PrizeTour {
        cities: Vec<(f64, f64)>,
        prizes: Vec<f64>,
    }

    impl PrizeTour {
        fn new(n: usize) -> Self {
            let cities = (0..n)
                .map(|i| {
                    let angle = i as f64 * 2.399;
                    let radius = 1.0 + (i % 4) as f64;
                    (radius * angle.cos(), radius * angle.sin())
                })
                .collect();
            let prizes = (0..n).map(|i| 1.0 + (i * 7 % 5) as f64).collect();
            Self { cities, prizes }
        }
    }

    impl CgaProblem for PrizeTour {
        type Solution = Vec<usize>;

        fn layout(&self) -> GeneLayout {
            GeneLayout::new(self.cities.len(), self.cities.len())
        }

        fn build_solution(&self, genes: &[usize]) -> Vec<usize> {
            let n = self.cities.len();
            genes[..n].iter().copied().filter(|&c| genes[n + c] == 1).collect()
        }

        fn evaluate(&self, tour: &Vec<usize>) -> Vec<f64> {
            let mut length = 0.0;
            let mut at = (0.0, 0.0);
            for &c in tour.iter().chain(std::iter::once(&usize::MAX)) {
                let next = self.cities.get(c).copied().unwrap_or((0.0, 0.0));
                length += ((next.0 - at.0).powi(2) + (next.1 - at.1).powi(2)).sqrt();
                at = next;
            }
            let prize: f64 = tour.iter().map(|&c| self.prizes[c]).sum();
            vec![length, -prize]
        }
    }

    fn config(budget: usize) -> CgaConfig {
        CgaConfig::default()
            .with_population_size(12)
            .with_evaluation_budget(budget)
            .with_cluster_count(3)
            .with_seed(42)
            .with_parallel(false)
    }

    #[test]
    fn test_cost_stays_within_budget() {
        let problem = PrizeTour::new(8);
        for budget in [12, 13, 101, 150] {
            let result = CgaRunner::run(&problem, &config(budget)).unwrap();
            assert!(result.cost >= budget, "cost {} below {budget}", result.cost);
            assert!(result.cost < budget + 2, "cost {} overshoots {budget}", result.cost);
        }
    }

    #[test]
    fn test_generation_count() {
        // 12 initial + 3 generations of 4 pairs each.
        let problem = PrizeTour::new(6);
        let config = config(12 + 3 * 8).with_offspring_pairs(4);
        let result = CgaRunner::run(&problem, &config).unwrap();
        assert_eq!(result.generations, 3);
        assert_eq!(result.cost, 36);
        assert_eq!(result.quality_history.len(), 3);
        let costs: Vec<usize> = result.quality_history.iter().map(|q| q.cost).collect();
        assert_eq!(costs, vec![20, 28, 36]);
    }

    #[test]
    fn test_final_archive_invariants() {
        let problem = PrizeTour::new(10);
        let result = CgaRunner::run(&problem, &config(600)).unwrap();
        let archive = &result.archive;
        assert!(!archive.is_empty());
        for (i, a) in archive.iter().enumerate() {
            assert!(problem.layout().is_valid(a.genes()));
            for b in &archive[i + 1..] {
                assert!(!a.same_genes(b));
                assert!(!dominates(a.objectives(), b.objectives()));
                assert!(!dominates(b.objectives(), a.objectives()));
            }
        }
    }

    #[test]
    fn test_same_seed_same_archive() {
        let problem = PrizeTour::new(8);
        let a = CgaRunner::run(&problem, &config(300)).unwrap();
        let b = CgaRunner::run(&problem, &config(300)).unwrap();
        let genes = |r: &CgaResult<Vec<usize>>| -> Vec<Vec<usize>> {
            r.archive.iter().map(|i| i.genes().to_vec()).collect()
        };
        assert_eq!(genes(&a), genes(&b));
        assert_eq!(a.cost, b.cost);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let problem = PrizeTour::new(8);
        let seq = CgaRunner::run(&problem, &config(200)).unwrap();
        let par = CgaRunner::run(&problem, &config(200).with_parallel(true)).unwrap();
        let ids = |r: &CgaResult<Vec<usize>>| -> Vec<u64> { r.archive.iter().map(|i| i.id()).collect() };
        assert_eq!(ids(&seq), ids(&par));
    }

    #[test]
    fn test_exclusion_disabled_by_default() {
        let problem = PrizeTour::new(8);
        let result = CgaRunner::run(&problem, &config(400)).unwrap();
        assert_eq!(result.exclusions, 0);
    }

    #[test]
    fn test_exclusion_policy_enabled() {
        let problem = PrizeTour::new(8);
        let config = config(400).with_exclusion(ExclusionPolicy::UsageThreshold {
            usage_limit: 0,
            duration: 2,
        });
        let result = CgaRunner::run(&problem, &config).unwrap();
        assert!(result.exclusions > 0);
        assert!(!result.archive.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let problem = PrizeTour::new(4);
        let err = CgaRunner::run(&problem, &config(100).with_population_size(1)).unwrap_err();
        assert!(matches!(err, CgaError::InvalidConfig(_)));
    }

    #[test]
    fn test_best_by_objective_sum() {
        let problem = PrizeTour::new(6);
        let result = CgaRunner::run(&problem, &config(120)).unwrap();
        let best = result.best().unwrap();
        assert!(result
            .archive
            .iter()
            .all(|i| best.objective_sum() <= i.objective_sum()));
    }

    #[test]
    fn test_unwritable_report_dir_disables_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, "").unwrap();
        let config = config(60).with_report_dir(file.join("sub"), 0);
        assert!(open_reporter(&config).is_none());
    }

    #[test]
    fn test_failed_report_writes_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("run");
        let mut writer = DiagnosticsWriter::create(&run_dir, 0).unwrap();
        std::fs::remove_dir_all(&run_dir).unwrap();

        let mut archive = vec![
            Individual::from_parts(0, vec![0], (), vec![1.0, 2.0], vec![]),
            Individual::from_parts(1, vec![1], (), vec![2.0, 1.0], vec![]),
        ];
        archive[0].record_unsuccessful_usage();
        let mut pool = ExclusionPool::new();
        pool.exclude_overused(&mut archive, 0, 2);
        let sample = QualitySample {
            cost: 10,
            hypervolume: f64::NAN,
            igd: f64::NAN,
            reference_distance: f64::NAN,
        };

        write_diagnostics(&mut writer, &sample, &pool, &ClusteringResult::default());
        assert!(!writer.excluded_path().exists());
        assert!(!writer.clusters_path().exists());
    }

    #[test]
    fn test_unsuccessful_pairs_charge_parents() {
        let mut archive: Vec<Individual<()>> = (0..3)
            .map(|i| Individual::from_parts(i, vec![i as usize], (), vec![i as f64], vec![]))
            .collect();
        let lineage = [
            Lineage {
                parents: [0, 1],
                children: [10, 11],
            },
            Lineage {
                parents: [1, 2],
                children: [2, 12], // child 2 made it into the archive
            },
        ];
        record_unsuccessful_pairs(&mut archive, &lineage);
        let unsuccessful: Vec<u32> = archive.iter().map(|i| i.usage().unsuccessful).collect();
        assert_eq!(unsuccessful, vec![1, 1, 0]);
    }
}
