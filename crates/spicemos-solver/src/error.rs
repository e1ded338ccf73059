//! Error types for spicemos-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix")]
    SingularMatrix,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("no convergence after {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("no device named {0}")]
    UnknownDevice(String),

    #[error("invalid analysis: {0}")]
    InvalidAnalysis(String),

    #[error(transparent)]
    Device(#[from] spicemos_devices::Error),

    #[error(transparent)]
    Core(#[from] spicemos_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
