//! Branch-and-bound MILP backend over the tableau simplex.
//!
//! Depth-first search branching on the lowest-index fractional integral
//! variable, low side first, so runs are reproducible. Good enough for the
//! path-query models here, where almost every variable is binary and the
//! LP relaxations are small.

use tracing::{debug, trace};

use crate::errors::{PathtimeError, Result};
use crate::features::ilp::domain::{IlpOutcome, IlpProblem, Sense, VarKind};
use crate::features::ilp::infrastructure::solvers::simplex::{solve_relaxation, LpOutcome};
use crate::features::ilp::ports::IlpSolver;

const INT_TOL: f64 = 1e-6;
const NODE_BUDGET: usize = 200_000;

/// In-crate reference MILP solver.
#[derive(Debug, Default, Clone, Copy)]
pub struct BranchBoundSolver;

impl BranchBoundSolver {
    pub fn new() -> Self {
        BranchBoundSolver
    }
}

impl IlpSolver for BranchBoundSolver {
    fn name(&self) -> &'static str {
        "branch-bound"
    }

    fn solve(&self, problem: &IlpProblem) -> Result<IlpOutcome> {
        let integral: Vec<usize> = problem
            .variables
            .iter()
            .enumerate()
            .filter(|(_, v)| matches!(v.kind, VarKind::Binary | VarKind::Integer))
            .map(|(i, _)| i)
            .collect();
        let root_bounds: Vec<(f64, f64)> = problem
            .variables
            .iter()
            .map(|v| (v.lower, v.upper))
            .collect();

        let mut best: Option<(f64, Vec<f64>)> = None;
        let mut stack: Vec<Vec<(f64, f64)>> = vec![root_bounds];
        let mut nodes = 0usize;

        while let Some(bounds) = stack.pop() {
            nodes += 1;
            if nodes > NODE_BUDGET {
                return Err(PathtimeError::ilp("branch-and-bound node budget exhausted"));
            }
            let relaxation = match solve_relaxation(problem, &bounds)? {
                LpOutcome::Infeasible => continue,
                LpOutcome::Optimal(sol) => sol,
            };
            if let Some((best_obj, _)) = &best {
                let improves = match problem.sense {
                    Sense::Maximize => relaxation.objective > best_obj + INT_TOL,
                    Sense::Minimize => relaxation.objective < best_obj - INT_TOL,
                };
                if !improves {
                    continue;
                }
            }

            let fractional = integral.iter().copied().find(|&i| {
                let v = relaxation.assignment[i];
                (v - v.round()).abs() > INT_TOL
            });
            match fractional {
                None => {
                    // Integral: snap and record.
                    let mut assignment = relaxation.assignment.clone();
                    for &i in &integral {
                        assignment[i] = assignment[i].round();
                    }
                    let objective = problem.objective.eval(&assignment);
                    trace!(objective, nodes, "incumbent");
                    best = Some((objective, assignment));
                }
                Some(i) => {
                    let v = relaxation.assignment[i];
                    let floor = v.floor();
                    let mut high = bounds.clone();
                    high[i].0 = high[i].0.max(floor + 1.0);
                    let mut low = bounds;
                    low[i].1 = low[i].1.min(floor);
                    // Low branch on top of the stack, explored first.
                    stack.push(high);
                    stack.push(low);
                }
            }
        }

        debug!(nodes, solved = best.is_some(), "branch-and-bound finished");
        Ok(match best {
            Some((objective, assignment)) => IlpOutcome::Optimal {
                objective,
                assignment,
            },
            None => IlpOutcome::NoSolution,
        })
    }
}
