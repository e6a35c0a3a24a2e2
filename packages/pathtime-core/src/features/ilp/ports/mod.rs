//! Solver port for mixed-integer linear programs.

use crate::errors::Result;
use crate::features::ilp::domain::{IlpOutcome, IlpProblem};

/// Backend capable of solving a bounded MILP to optimality.
pub trait IlpSolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve to optimality. Infeasible models are an ordinary
    /// [`IlpOutcome::NoSolution`], not an error.
    fn solve(&self, problem: &IlpProblem) -> Result<IlpOutcome>;
}
