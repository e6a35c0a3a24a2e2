//! Edge-weight reconstruction from measured basis paths.
//!
//! With the basis matrix `B` and the vector `y` of measured basis-path
//! lengths, the reduced-edge weights are `w = B^-1 y`. Bad rows never got a
//! feasible path, so their `y` entries stay zero; the weights then predict
//! length zero for whatever synthetic rows remained.

use tracing::{debug, info, instrument};

use crate::errors::{PathtimeError, Result};
use crate::features::basis::application::engine::BasisResult;
use crate::features::basis::domain::weights::{apply_reduced_weights, weighted_length};
use crate::features::dag::domain::ControlFlowDag;

#[derive(Debug, Clone)]
pub struct EdgeWeightEstimate {
    /// Weight per reduced edge, in canonical order.
    pub reduced_weights: Vec<f64>,
    /// Largest |predicted - measured| over the basis paths.
    pub max_error: f64,
}

/// Solve for the reduced-edge weights and install them on the DAG.
/// Every basis path gets its predicted length recorded as a side effect.
#[instrument(skip_all)]
pub fn estimate_edge_weights(
    dag: &mut ControlFlowDag,
    result: &mut BasisResult,
) -> Result<EdgeWeightEstimate> {
    let b = result.matrix.dim();
    let mut y = vec![0.0; b];
    for (i, path) in result.paths.iter().enumerate() {
        if path.measured.is_none() {
            return Err(PathtimeError::measurement(format!(
                "basis path {} was never measured",
                path.id
            )));
        }
        y[i] = path.measured_value();
    }

    let inverse = result.matrix.invert().map_err(|_| {
        PathtimeError::degenerate("basis matrix is singular; cannot reconstruct edge weights")
    })?;
    let reduced_weights = inverse.mul_vec(&y);

    let mut max_error = 0.0_f64;
    for path in &mut result.paths {
        let predicted = weighted_length(&path.compressed, &reduced_weights);
        path.predicted = Some(predicted);
        let error = (predicted - path.measured_value()).abs();
        max_error = max_error.max(error);
        debug!(path = %path.id, predicted, measured = path.measured_value(), "basis path prediction");
    }

    apply_reduced_weights(dag, &reduced_weights);
    info!(max_error, "edge weights reconstructed");
    Ok(EdgeWeightEstimate {
        reduced_weights,
        max_error,
    })
}
