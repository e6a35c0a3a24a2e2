//! Integer-linear-programming feature: path-query models, persistent
//! constraints, and solver backends behind the [`ports::IlpSolver`] port.

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{ConstraintStore, IlpOutcome, IlpProblem};
pub use infrastructure::extreme_path::{find_extreme_path, ExtremePath, Extremum};
pub use infrastructure::solvers::{default_solver, BranchBoundSolver};
pub use ports::IlpSolver;
