//! Error type shared by every stage of the optimizer.

use thiserror::Error;

/// Errors raised by the clustered GA.
///
/// Configuration and reference-front errors are fatal and surface before
/// the first generation. Diagnostic I/O errors are only returned by the
/// report writers themselves; the runner logs and drops them.
#[derive(Error, Debug)]
pub enum CgaError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("population is empty")]
    EmptyPopulation,

    #[error("malformed reference front at line {line}: {content:?}")]
    ReferenceFront { line: usize, content: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CgaError>;
