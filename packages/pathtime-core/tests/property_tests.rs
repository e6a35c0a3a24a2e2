//! Property checks for the numerical kernels.

use proptest::prelude::*;

use pathtime_core::features::basis::domain::matrix::BasisMatrix;
use pathtime_core::features::basis::domain::weights::{cofactor_weights, weighted_length};
use pathtime_core::features::ilp::domain::{Cmp, IlpOutcome, IlpProblem, LinExpr, Sense};
use pathtime_core::features::ilp::infrastructure::solvers::BranchBoundSolver;
use pathtime_core::IlpSolver;

fn small_matrix(dim: usize) -> impl Strategy<Value = BasisMatrix> {
    proptest::collection::vec(
        proptest::collection::vec(-3i8..=3, dim),
        dim,
    )
    .prop_map(|rows| {
        BasisMatrix::from_rows(
            rows.into_iter()
                .map(|r| r.into_iter().map(f64::from).collect())
                .collect(),
        )
        .unwrap()
    })
}

proptest! {
    #[test]
    fn prop_row_swap_preserves_det_magnitude(
        m in (1usize..=4).prop_flat_map(small_matrix),
        a in 0usize..4,
        b in 0usize..4,
    ) {
        let a = a % m.dim();
        let b = b % m.dim();
        let before = m.det_abs();
        let mut swapped = m.clone();
        swapped.swap_rows(a, b);
        prop_assert!((swapped.det_abs() - before).abs() < 1e-6 * (1.0 + before));
    }

    #[test]
    fn prop_cofactor_objective_is_replacement_det(
        m in (1usize..=4).prop_flat_map(small_matrix),
        candidate_bits in proptest::collection::vec(0u8..=1, 4),
        row in 0usize..4,
    ) {
        let row = row % m.dim();
        let candidate: Vec<f64> = candidate_bits[..m.dim()]
            .iter()
            .map(|&b| f64::from(b))
            .collect();
        let weights = cofactor_weights(&m, row);
        let objective = weighted_length(&candidate, &weights);
        let mut replaced = m.clone();
        replaced.set_row(row, &candidate);
        let det = replaced.det();
        prop_assert!(
            (objective - det).abs() < 1e-6 * (1.0 + det.abs()),
            "objective {objective} vs det {det}"
        );
    }

    #[test]
    fn prop_inverse_multiplies_back_to_identity(
        m in (1usize..=4).prop_flat_map(small_matrix),
    ) {
        prop_assume!(m.det_abs() > 0.1);
        let inv = m.invert().unwrap();
        for c in 0..m.dim() {
            let col: Vec<f64> = (0..m.dim()).map(|r| m.get(r, c)).collect();
            let e_c = inv.mul_vec(&col);
            for (r, value) in e_c.iter().enumerate() {
                let expected = if r == c { 1.0 } else { 0.0 };
                prop_assert!((value - expected).abs() < 1e-6, "entry ({r},{c}) = {value}");
            }
        }
    }

    #[test]
    fn prop_unconstrained_binary_max_selects_positive_coefficients(
        coeffs in proptest::collection::vec(-5i8..=5, 1..=6),
    ) {
        let mut problem = IlpProblem::new("prop", Sense::Maximize);
        let vars: Vec<_> = (0..coeffs.len())
            .map(|i| problem.add_binary(format!("x{i}")))
            .collect();
        let mut objective = LinExpr::new();
        for (v, c) in vars.iter().zip(&coeffs) {
            objective.add_term(*v, f64::from(*c));
        }
        problem.set_objective(objective, Sense::Maximize);
        let IlpOutcome::Optimal { objective, assignment } =
            BranchBoundSolver::new().solve(&problem).unwrap()
        else {
            panic!("box model is always feasible");
        };
        let expected: f64 = coeffs.iter().filter(|&&c| c > 0).map(|&c| f64::from(c)).sum();
        prop_assert!((objective - expected).abs() < 1e-6);
        for (i, c) in coeffs.iter().enumerate() {
            if *c > 0 {
                prop_assert_eq!(assignment[i], 1.0);
            }
            if *c < 0 {
                prop_assert_eq!(assignment[i], 0.0);
            }
        }
    }

    #[test]
    fn prop_knapsack_objective_respects_capacity(
        weights in proptest::collection::vec(1i8..=4, 1..=5),
        capacity in 1i8..=8,
    ) {
        let mut problem = IlpProblem::new("knap", Sense::Maximize);
        let vars: Vec<_> = (0..weights.len())
            .map(|i| problem.add_binary(format!("x{i}")))
            .collect();
        let mut objective = LinExpr::new();
        let mut cap = LinExpr::new();
        for (v, w) in vars.iter().zip(&weights) {
            objective.add_term(*v, f64::from(*w));
            cap.add_term(*v, f64::from(*w));
        }
        problem.set_objective(objective, Sense::Maximize);
        problem.add_constraint("cap", cap, Cmp::Le, f64::from(capacity));
        let IlpOutcome::Optimal { objective, assignment } =
            BranchBoundSolver::new().solve(&problem).unwrap()
        else {
            panic!("empty selection is always feasible");
        };
        prop_assert!(objective <= f64::from(capacity) + 1e-6);
        let used: f64 = assignment
            .iter()
            .zip(&weights)
            .map(|(x, w)| x * f64::from(*w))
            .sum();
        prop_assert!(used <= f64::from(capacity) + 1e-6);
        prop_assert!((objective - used).abs() < 1e-6);
    }
}
