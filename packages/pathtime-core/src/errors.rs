//! Error types for pathtime-core
//!
//! Only genuinely fatal conditions live here. ILP infeasibility, SMT-UNSAT
//! verdicts and row demotions are ordinary results inside the engine loops
//! and are modeled as enum variants in their own modules.

use thiserror::Error;

/// Main error type for pathtime-core operations
#[derive(Debug, Error)]
pub enum PathtimeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input graph is not a single-source, single-sink DAG, or its
    /// reduced-edge dimension does not match `m - n + 2`.
    #[error("Malformed DAG: {0}")]
    MalformedDag(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SMT oracle failure distinct from an UNSAT verdict
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Measurement backend failure
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// ILP solver failure distinct from an infeasible model
    #[error("ILP solver error: {0}")]
    Ilp(String),

    /// The basis matrix became numerically unusable (for example, a
    /// singular matrix at edge-weight estimation time).
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

impl PathtimeError {
    /// Create a malformed-DAG error
    pub fn malformed_dag(msg: impl Into<String>) -> Self {
        PathtimeError::MalformedDag(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PathtimeError::Config(msg.into())
    }

    /// Create an oracle error
    pub fn oracle(msg: impl Into<String>) -> Self {
        PathtimeError::Oracle(msg.into())
    }

    /// Create a measurement error
    pub fn measurement(msg: impl Into<String>) -> Self {
        PathtimeError::Measurement(msg.into())
    }

    /// Create an ILP solver error
    pub fn ilp(msg: impl Into<String>) -> Self {
        PathtimeError::Ilp(msg.into())
    }

    /// Create a numerical-degeneracy error
    pub fn degenerate(msg: impl Into<String>) -> Self {
        PathtimeError::NumericalDegeneracy(msg.into())
    }
}

/// Result type alias for pathtime operations
pub type Result<T> = std::result::Result<T, PathtimeError>;
