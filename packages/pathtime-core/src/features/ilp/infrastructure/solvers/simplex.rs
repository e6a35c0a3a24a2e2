//! Two-phase tableau simplex over bounded variables.
//!
//! This is the LP core under the branch-and-bound backend. Variables are
//! shifted by their lower bounds into the nonnegative orthant and their
//! upper bounds become explicit rows, so the tableau only ever deals with
//! `x >= 0`. Bland's rule keeps pivoting deterministic and cycle-free.

use crate::errors::{PathtimeError, Result};
use crate::features::ilp::domain::{Cmp, IlpProblem, Sense};

const PIVOT_TOL: f64 = 1e-9;
const FEAS_TOL: f64 = 1e-7;

#[derive(Debug, Clone)]
pub(crate) struct LpSolution {
    pub objective: f64,
    /// Values of the problem's variables, in original (unshifted) space.
    pub assignment: Vec<f64>,
}

#[derive(Debug, Clone)]
pub(crate) enum LpOutcome {
    Optimal(LpSolution),
    Infeasible,
}

/// Solve the LP relaxation of `problem`, with per-variable bounds taken
/// from `bounds` instead of the problem (branch-and-bound tightens these).
pub(crate) fn solve_relaxation(
    problem: &IlpProblem,
    bounds: &[(f64, f64)],
) -> Result<LpOutcome> {
    let n = problem.num_vars();
    debug_assert_eq!(bounds.len(), n);
    for (lower, upper) in bounds {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(PathtimeError::ilp("all variables must carry finite bounds"));
        }
        if *lower > *upper + FEAS_TOL {
            return Ok(LpOutcome::Infeasible);
        }
    }
    let lowers: Vec<f64> = bounds.iter().map(|(l, _)| *l).collect();
    let widths: Vec<f64> = bounds.iter().map(|(l, u)| (u - l).max(0.0)).collect();

    // Rows over shifted variables, rhs adjusted by the lower-bound shift.
    struct Row {
        coeffs: Vec<f64>,
        cmp: Cmp,
        rhs: f64,
    }
    let mut rows: Vec<Row> = Vec::new();
    for constraint in &problem.constraints {
        let coeffs = constraint.expr.to_dense(n);
        let shift: f64 = coeffs.iter().zip(&lowers).map(|(c, l)| c * l).sum();
        rows.push(Row {
            coeffs,
            cmp: constraint.cmp,
            rhs: constraint.rhs - shift,
        });
    }
    for (j, width) in widths.iter().enumerate() {
        let mut coeffs = vec![0.0; n];
        coeffs[j] = 1.0;
        rows.push(Row {
            coeffs,
            cmp: Cmp::Le,
            rhs: *width,
        });
    }

    // Normalize to nonnegative rhs, then assign slack and artificial
    // columns. Column layout: structural | slack/surplus | artificial.
    for row in &mut rows {
        if row.rhs < 0.0 {
            for c in &mut row.coeffs {
                *c = -*c;
            }
            row.rhs = -row.rhs;
            row.cmp = match row.cmp {
                Cmp::Le => Cmp::Ge,
                Cmp::Ge => Cmp::Le,
                Cmp::Eq => Cmp::Eq,
            };
        }
    }

    let m = rows.len();
    let num_slack = rows
        .iter()
        .filter(|r| matches!(r.cmp, Cmp::Le | Cmp::Ge))
        .count();
    let num_artificial = rows
        .iter()
        .filter(|r| matches!(r.cmp, Cmp::Ge | Cmp::Eq))
        .count();
    let total = n + num_slack + num_artificial;

    let mut tableau: Vec<Vec<f64>> = Vec::with_capacity(m);
    let mut basis: Vec<usize> = Vec::with_capacity(m);
    let mut artificial_cols: Vec<usize> = Vec::new();
    let mut next_slack = n;
    let mut next_artificial = n + num_slack;
    for row in &rows {
        let mut t = vec![0.0; total + 1];
        t[..n].copy_from_slice(&row.coeffs);
        t[total] = row.rhs;
        match row.cmp {
            Cmp::Le => {
                t[next_slack] = 1.0;
                basis.push(next_slack);
                next_slack += 1;
            }
            Cmp::Ge => {
                t[next_slack] = -1.0;
                next_slack += 1;
                t[next_artificial] = 1.0;
                basis.push(next_artificial);
                artificial_cols.push(next_artificial);
                next_artificial += 1;
            }
            Cmp::Eq => {
                t[next_artificial] = 1.0;
                basis.push(next_artificial);
                artificial_cols.push(next_artificial);
                next_artificial += 1;
            }
        }
        tableau.push(t);
    }

    let is_artificial = |col: usize| col >= n + num_slack;

    // Phase 1: maximize -(sum of artificials).
    if num_artificial > 0 {
        let mut obj = vec![0.0; total + 1];
        for &col in &artificial_cols {
            obj[col] = 1.0;
        }
        for (r, &b) in basis.iter().enumerate() {
            if is_artificial(b) {
                for c in 0..=total {
                    obj[c] -= tableau[r][c];
                }
            }
        }
        pivot_to_optimum(&mut tableau, &mut basis, &mut obj, total, |_| true)?;
        let infeasibility = -obj[total];
        if infeasibility > FEAS_TOL {
            return Ok(LpOutcome::Infeasible);
        }

        // Drive remaining artificials out of the basis, dropping redundant
        // rows whose pivots have all vanished.
        let mut r = 0;
        while r < tableau.len() {
            if is_artificial(basis[r]) {
                let pivot_col = (0..n + num_slack)
                    .find(|&c| tableau[r][c].abs() > PIVOT_TOL);
                match pivot_col {
                    Some(c) => pivot(&mut tableau, &mut basis, r, c, total),
                    None => {
                        tableau.remove(r);
                        basis.remove(r);
                        continue;
                    }
                }
            }
            r += 1;
        }
    }

    // Phase 2: the real objective, as a maximization.
    let c_sign = match problem.sense {
        Sense::Maximize => 1.0,
        Sense::Minimize => -1.0,
    };
    let dense_obj = problem.objective.to_dense(n);
    let mut obj = vec![0.0; total + 1];
    for (j, c) in dense_obj.iter().enumerate() {
        obj[j] = -c_sign * c;
    }
    for (r, &b) in basis.iter().enumerate() {
        let factor = obj[b];
        if factor.abs() > 0.0 {
            for c in 0..=total {
                obj[c] -= factor * tableau[r][c];
            }
        }
    }
    pivot_to_optimum(&mut tableau, &mut basis, &mut obj, total, |c| {
        !is_artificial(c)
    })?;

    // Read the shifted solution back out.
    let mut shifted = vec![0.0; n];
    for (r, &b) in basis.iter().enumerate() {
        if b < n {
            shifted[b] = tableau[r][total];
        }
    }
    let assignment: Vec<f64> = shifted
        .iter()
        .zip(&lowers)
        .map(|(x, l)| x + l)
        .collect();
    let objective = problem.objective.eval(&assignment);
    Ok(LpOutcome::Optimal(LpSolution {
        objective,
        assignment,
    }))
}

/// Run Bland-rule pivots until no entering column improves the objective.
fn pivot_to_optimum(
    tableau: &mut Vec<Vec<f64>>,
    basis: &mut Vec<usize>,
    obj: &mut [f64],
    total: usize,
    allowed: impl Fn(usize) -> bool,
) -> Result<()> {
    let max_iterations = 50_000usize.max(100 * (tableau.len() + total));
    for _ in 0..max_iterations {
        // Bland: smallest-index column with a negative reduced cost.
        let entering = (0..total).find(|&c| allowed(c) && obj[c] < -PIVOT_TOL);
        let Some(entering) = entering else {
            return Ok(());
        };
        // Min-ratio leaving row; ties broken by smallest basis index.
        let mut leaving: Option<(usize, f64)> = None;
        for (r, row) in tableau.iter().enumerate() {
            let a = row[entering];
            if a > PIVOT_TOL {
                let ratio = row[total] / a;
                match leaving {
                    None => leaving = Some((r, ratio)),
                    Some((best_r, best_ratio)) => {
                        if ratio < best_ratio - PIVOT_TOL
                            || ((ratio - best_ratio).abs() <= PIVOT_TOL
                                && basis[r] < basis[best_r])
                        {
                            leaving = Some((r, ratio));
                        }
                    }
                }
            }
        }
        let Some((leaving, _)) = leaving else {
            // All variables are bounded, so this indicates a modeling bug.
            return Err(PathtimeError::ilp("LP relaxation is unbounded"));
        };
        pivot(tableau, basis, leaving, entering, total);
        let factor = obj[entering];
        if factor.abs() > 0.0 {
            for c in 0..=total {
                obj[c] -= factor * tableau[leaving][c];
            }
        }
    }
    Err(PathtimeError::ilp("simplex iteration budget exhausted"))
}

fn pivot(
    tableau: &mut [Vec<f64>],
    basis: &mut [usize],
    row: usize,
    col: usize,
    total: usize,
) {
    let pivot_value = tableau[row][col];
    for c in 0..=total {
        tableau[row][c] /= pivot_value;
    }
    for r in 0..tableau.len() {
        if r == row {
            continue;
        }
        let factor = tableau[r][col];
        if factor.abs() > 0.0 {
            for c in 0..=total {
                let delta = factor * tableau[row][c];
                tableau[r][c] -= delta;
            }
        }
    }
    basis[row] = col;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ilp::domain::{LinExpr, Sense, VarKind};

    fn bounds_of(problem: &IlpProblem) -> Vec<(f64, f64)> {
        problem.variables.iter().map(|v| (v.lower, v.upper)).collect()
    }

    #[test]
    fn test_maximize_on_box() {
        let mut p = IlpProblem::new("box", Sense::Maximize);
        let x = p.add_variable("x", VarKind::Continuous, 0.0, 4.0);
        let y = p.add_variable("y", VarKind::Continuous, 0.0, 3.0);
        let mut obj = LinExpr::new();
        obj.add_term(x, 2.0);
        obj.add_term(y, 1.0);
        p.set_objective(obj, Sense::Maximize);
        let LpOutcome::Optimal(sol) = solve_relaxation(&p, &bounds_of(&p)).unwrap() else {
            panic!("expected optimal");
        };
        assert!((sol.objective - 11.0).abs() < 1e-6);
        assert!((sol.assignment[0] - 4.0).abs() < 1e-6);
        assert!((sol.assignment[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_binding_constraint() {
        let mut p = IlpProblem::new("knap", Sense::Maximize);
        let x = p.add_variable("x", VarKind::Continuous, 0.0, 10.0);
        let y = p.add_variable("y", VarKind::Continuous, 0.0, 10.0);
        let mut obj = LinExpr::new();
        obj.add_term(x, 3.0);
        obj.add_term(y, 2.0);
        p.set_objective(obj, Sense::Maximize);
        let mut cap = LinExpr::new();
        cap.add_term(x, 1.0);
        cap.add_term(y, 1.0);
        p.add_constraint("cap", cap, Cmp::Le, 4.0);
        let LpOutcome::Optimal(sol) = solve_relaxation(&p, &bounds_of(&p)).unwrap() else {
            panic!("expected optimal");
        };
        assert!((sol.objective - 12.0).abs() < 1e-6);
        assert!((sol.assignment[0] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_equality_and_minimize() {
        let mut p = IlpProblem::new("eq", Sense::Minimize);
        let x = p.add_variable("x", VarKind::Continuous, 0.0, 10.0);
        let y = p.add_variable("y", VarKind::Continuous, 0.0, 10.0);
        let mut obj = LinExpr::new();
        obj.add_term(x, 1.0);
        obj.add_term(y, 3.0);
        p.set_objective(obj, Sense::Minimize);
        let mut sum = LinExpr::new();
        sum.add_term(x, 1.0);
        sum.add_term(y, 1.0);
        p.add_constraint("sum", sum, Cmp::Eq, 5.0);
        let LpOutcome::Optimal(sol) = solve_relaxation(&p, &bounds_of(&p)).unwrap() else {
            panic!("expected optimal");
        };
        assert!((sol.objective - 5.0).abs() < 1e-6);
        assert!((sol.assignment[0] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_rows() {
        let mut p = IlpProblem::new("infeasible", Sense::Maximize);
        let x = p.add_variable("x", VarKind::Continuous, 0.0, 1.0);
        p.set_objective(LinExpr::term(x, 1.0), Sense::Maximize);
        p.add_constraint("hi", LinExpr::term(x, 1.0), Cmp::Ge, 2.0);
        assert!(matches!(
            solve_relaxation(&p, &bounds_of(&p)).unwrap(),
            LpOutcome::Infeasible
        ));
    }

    #[test]
    fn test_negative_lower_bounds_shift() {
        let mut p = IlpProblem::new("shift", Sense::Minimize);
        let x = p.add_variable("x", VarKind::Continuous, -5.0, 5.0);
        p.set_objective(LinExpr::term(x, 1.0), Sense::Minimize);
        let LpOutcome::Optimal(sol) = solve_relaxation(&p, &bounds_of(&p)).unwrap() else {
            panic!("expected optimal");
        };
        assert!((sol.assignment[0] + 5.0).abs() < 1e-6);
        assert!((sol.objective + 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_crossed_bound_override_is_infeasible() {
        let mut p = IlpProblem::new("crossed", Sense::Maximize);
        let x = p.add_variable("x", VarKind::Continuous, 0.0, 1.0);
        p.set_objective(LinExpr::term(x, 1.0), Sense::Maximize);
        assert!(matches!(
            solve_relaxation(&p, &[(2.0, 1.0)]).unwrap(),
            LpOutcome::Infeasible
        ));
    }
}
