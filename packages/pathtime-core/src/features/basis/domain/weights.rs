//! Cofactor edge weights for basis-row replacement.
//!
//! When the engine considers replacing row `r` of the basis, the weight of
//! reduced edge `j` is the signed cofactor `(-1)^(r+j) * det(minor(r, j))`.
//! With those weights, the ILP objective of any candidate path equals the
//! determinant the basis would have after the replacement, so maximizing the
//! objective maximizes the new determinant directly.

use tracing::trace;

use crate::features::basis::domain::matrix::BasisMatrix;
use crate::features::dag::domain::ControlFlowDag;

/// Cofactor weight of each reduced edge for a replacement of `row`.
pub fn cofactor_weights(basis: &BasisMatrix, row: usize) -> Vec<f64> {
    let b = basis.dim();
    if b == 1 {
        // The empty minor has determinant 1; the single coordinate gets it.
        return vec![1.0];
    }
    (0..b)
        .map(|j| {
            let sign = if (row + j) % 2 == 0 { 1.0 } else { -1.0 };
            sign * basis.minor_det(row, j)
        })
        .collect()
}

/// Write reduced-edge weights onto the DAG's full edge-weight vector.
/// Special edges keep weight zero.
pub fn apply_reduced_weights(dag: &mut ControlFlowDag, reduced_weights: &[f64]) {
    dag.reset_edge_weights();
    if dag.num_nodes() == 1 {
        return;
    }
    debug_assert_eq!(reduced_weights.len(), dag.edges_reduced().len());
    for (j, weight) in reduced_weights.iter().enumerate() {
        let idx = dag.reduced_edge_index(j);
        dag.edge_weights[idx] = *weight;
    }
    trace!(weights = ?reduced_weights, "applied reduced-edge weights");
}

/// Dot product of a compressed path with reduced-edge weights: the value the
/// ILP objective assigns to that path.
pub fn weighted_length(compressed: &[f64], reduced_weights: &[f64]) -> f64 {
    compressed
        .iter()
        .zip(reduced_weights)
        .map(|(x, w)| x * w)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dimension_weight_is_one() {
        let basis = BasisMatrix::identity(1);
        assert_eq!(cofactor_weights(&basis, 0), vec![1.0]);
    }

    #[test]
    fn test_replacement_objective_equals_new_determinant() {
        let basis = BasisMatrix::from_rows(vec![
            vec![1.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
        ])
        .unwrap();
        for row in 0..3 {
            let weights = cofactor_weights(&basis, row);
            let candidate = vec![1.0, 1.0, 1.0];
            let objective = weighted_length(&candidate, &weights);
            let mut replaced = basis.clone();
            replaced.set_row(row, &candidate);
            assert!(
                (objective - replaced.det()).abs() < 1e-9,
                "row {row}: objective {objective} vs det {}",
                replaced.det()
            );
        }
    }

    #[test]
    fn test_identity_cofactors() {
        let basis = BasisMatrix::identity(3);
        let weights = cofactor_weights(&basis, 1);
        // Replacing row 1 of I: only coordinate 1 affects the determinant.
        assert_eq!(weights, vec![0.0, 1.0, 0.0]);
    }
}
