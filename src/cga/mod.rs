//! Clustered multi-objective genetic algorithm.
//!
//! A steady-state MOEA for coupled routing + selection problems. Users
//! describe their problem by implementing [`CgaProblem`]: a gene layout,
//! how genes build a solution, and how a solution is evaluated into a
//! minimized objective vector.
//!
//! Each generation clusters the nondominated archive, draws parent pairs
//! from a cluster picked by a dispersion tournament whose pressure decays
//! with the spent budget, absorbs the offspring into the archive, and
//! shrinks the working population with a distance-biased filter.
//! Unproductive archive members can be excluded for a few generations.
//!
//! # Key Types
//!
//! - [`CgaConfig`]: Algorithm parameters
//! - [`CgaRunner`]: Executes the generation loop
//! - [`CgaResult`]: Final archive with run statistics
//! - [`Individual`]: Evaluated chromosome with usage and exclusion counters
//!
//! # Submodules
//!
//! - [`archive`]: Deduplication, nondominated filtering, absorption
//! - [`clustering`]: Archive niching (k-means)
//! - [`operators`]: Coupled crossover, mutation, initial population
//! - [`quality`]: Hypervolume, IGD, reference-front distance
//!
//! # References
//!
//! - Zitzler, Laumanns & Thiele (2001), *SPEA2: Improving the Strength
//!   Pareto Evolutionary Algorithm*
//! - Deb et al. (2002), *A Fast and Elitist Multiobjective GA: NSGA-II*
//! - Feillet, Dejax & Gendreau (2005), *Traveling Salesman Problems with
//!   Profits*

pub mod archive;
pub mod clustering;
mod config;
mod exclusion;
pub mod operators;
pub mod quality;
mod replacement;
mod report;
mod runner;
mod schedule;
mod selection;
mod types;

pub use config::CgaConfig;
pub use exclusion::{ExclusionPolicy, ExclusionPool};
pub use replacement::{is_coincident, ReplacementFilter};
pub use report::DiagnosticsWriter;
pub use runner::{CgaResult, CgaRunner};
pub use schedule::TournamentSchedule;
pub use selection::{dynamic_tournament_width, ClusterSelector};
pub use types::{
    objective_distance, CgaProblem, ExclusionState, GeneLayout, Individual, UsageCounters,
};
