pub mod constraints;
pub mod problem;

pub use constraints::ConstraintStore;
pub use problem::{
    Cmp, Constraint, IlpOutcome, IlpProblem, LinExpr, Sense, VarId, VarKind, Variable,
};
