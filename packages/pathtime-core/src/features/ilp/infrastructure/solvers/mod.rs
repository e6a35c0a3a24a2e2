//! MILP solver backends.

pub mod branch_bound;
#[cfg(feature = "cbc")]
pub mod cbc_backend;
mod simplex;

pub use branch_bound::BranchBoundSolver;
#[cfg(feature = "cbc")]
pub use cbc_backend::CbcSolver;

use std::sync::Arc;

use crate::features::ilp::ports::IlpSolver;

/// The backend used when none is configured explicitly.
pub fn default_solver() -> Arc<dyn IlpSolver> {
    Arc::new(BranchBoundSolver::new())
}
