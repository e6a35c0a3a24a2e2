//! COIN-OR CBC backend, enabled with the `cbc` feature.
//!
//! Requires the native CBC libraries at link time; the in-crate
//! branch-and-bound backend stays the default so the crate builds
//! everywhere.

use tracing::debug;

use crate::errors::Result;
use crate::features::ilp::domain::{Cmp, IlpOutcome, IlpProblem, Sense, VarKind};
use crate::features::ilp::ports::IlpSolver;

#[derive(Debug, Default, Clone, Copy)]
pub struct CbcSolver;

impl CbcSolver {
    pub fn new() -> Self {
        CbcSolver
    }
}

impl IlpSolver for CbcSolver {
    fn name(&self) -> &'static str {
        "cbc"
    }

    fn solve(&self, problem: &IlpProblem) -> Result<IlpOutcome> {
        let mut model = coin_cbc::Model::default();
        model.set_parameter("logLevel", "0");

        let cols: Vec<coin_cbc::Col> = problem
            .variables
            .iter()
            .map(|var| {
                let col = model.add_col();
                model.set_col_lower(col, var.lower);
                model.set_col_upper(col, var.upper);
                if matches!(var.kind, VarKind::Binary | VarKind::Integer) {
                    model.set_integer(col);
                }
                col
            })
            .collect();

        for constraint in &problem.constraints {
            let row = model.add_row();
            for (j, coeff) in constraint.expr.to_dense(problem.num_vars()).iter().enumerate() {
                if *coeff != 0.0 {
                    model.set_weight(row, cols[j], *coeff);
                }
            }
            match constraint.cmp {
                Cmp::Le => model.set_row_upper(row, constraint.rhs),
                Cmp::Ge => model.set_row_lower(row, constraint.rhs),
                Cmp::Eq => {
                    model.set_row_lower(row, constraint.rhs);
                    model.set_row_upper(row, constraint.rhs);
                }
            }
        }

        for (j, coeff) in problem
            .objective
            .to_dense(problem.num_vars())
            .iter()
            .enumerate()
        {
            model.set_obj_coeff(cols[j], *coeff);
        }
        model.set_obj_sense(match problem.sense {
            Sense::Maximize => coin_cbc::Sense::Maximize,
            Sense::Minimize => coin_cbc::Sense::Minimize,
        });

        let solution = model.solve();
        if !solution.raw().is_proven_optimal() {
            debug!(problem = %problem.name, "cbc found no optimal solution");
            return Ok(IlpOutcome::NoSolution);
        }
        let assignment: Vec<f64> = cols.iter().map(|&c| solution.col(c)).collect();
        let objective = problem.objective.eval(&assignment);
        Ok(IlpOutcome::Optimal {
            objective,
            assignment,
        })
    }
}
