//! Clustered multi-objective evolutionary optimization.
//!
//! - **Clustered GA (CGA)**: steady-state Pareto optimizer with a bounded
//!   nondominated archive, cluster-based parent selection under a decaying
//!   tournament schedule, temporary exclusion of unproductive archive
//!   members, and distance-biased replacement.
//!
//! # Architecture
//!
//! The crate is domain-agnostic: the routing and selection semantics of a
//! chromosome are defined by the consumer through [`cga::CgaProblem`].
//! Diagnostics go through `tracing`; no subscriber is installed here.

pub mod cga;
pub mod error;
pub mod random;

pub use error::{CgaError, Result};
