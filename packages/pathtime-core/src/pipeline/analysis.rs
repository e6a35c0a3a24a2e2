//! End-to-end WCET analysis.
//!
//! The run goes: construct a feasible path basis, refine it, measure every
//! basis path under its witness inputs, reconstruct edge weights, and ask
//! the weighted DAG for the longest feasible path. Overcomplete mode
//! additionally fits the smallest measurement slack `mu_max` and, with
//! `ob_extraction`, derives the estimate from the delta-compatible
//! formulation instead of the reconstructed weights.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::errors::{PathtimeError, Result};
use crate::features::basis::application::engine::{BasisEngine, BasisResult};
use crate::features::basis::application::estimator::estimate_edge_weights;
use crate::features::dag::domain::ControlFlowDag;
use crate::features::enumerator::application::PathEnumerator;
use crate::features::enumerator::domain::GenerationMode;
use crate::features::feasibility::application::FeasibilityChecker;
use crate::features::feasibility::domain::Path;
use crate::features::ilp::domain::ConstraintStore;
use crate::features::ilp::infrastructure::expressible::{
    find_least_compatible_mu_max, find_longest_path_with_delta, find_worst_expressible_path,
};
use crate::pipeline::context::Context;
use crate::shared::models::{Interval, NodeId};

/// Result of one analysis run.
#[derive(Debug, Serialize)]
pub struct WcetReport {
    /// Predicted worst-case execution time.
    pub estimate: f64,
    /// The path the estimate belongs to.
    pub worst_path: Vec<NodeId>,
    /// Measured value of the worst path, when it was measured.
    pub worst_measured: Option<u64>,
    pub basis_dimension: usize,
    pub num_bad_rows: usize,
    pub refined_rows: usize,
    /// Largest |predicted - measured| over the basis paths.
    pub max_prediction_error: f64,
    /// Smallest measurement slack compatible with the basis, in
    /// overcomplete mode.
    pub mu_max: Option<f64>,
    /// Scaled bound on how far the estimate can sit from the true worst
    /// case, in overcomplete mode.
    pub error_bound: Option<f64>,
    pub num_paths_total: u64,
}

impl WcetReport {
    /// JSON rendering for downstream tooling.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            PathtimeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

/// One analysis over one DAG. Owns the DAG (edge weights mutate during the
/// run) and the accumulated path constraints.
pub struct Analysis<'a> {
    ctx: &'a Context,
    dag: ControlFlowDag,
    store: ConstraintStore,
}

impl<'a> Analysis<'a> {
    pub fn new(ctx: &'a Context, dag: ControlFlowDag) -> Self {
        Analysis {
            ctx,
            dag,
            store: ConstraintStore::new(),
        }
    }

    pub fn dag(&self) -> &ControlFlowDag {
        &self.dag
    }

    /// Run the full pipeline and produce a report.
    #[instrument(skip_all)]
    pub fn run(&mut self) -> Result<WcetReport> {
        let config = &self.ctx.config;
        let checker = FeasibilityChecker::new(
            self.ctx.oracle.as_ref(),
            self.ctx.measurer.as_ref(),
            config.measurement_repeats,
        );

        let (mut result, refined_rows) = {
            let mut engine = BasisEngine::new(
                &mut self.dag,
                config,
                self.ctx.solver.as_ref(),
                &checker,
                &mut self.store,
            );
            let mut result = engine.generate_basis_paths()?;
            let refined = engine.refine_basis(&mut result)?;
            if config.over_complete_basis {
                engine.extend_overcomplete(&mut result)?;
            }
            (result, refined)
        };
        if result.paths.is_empty() {
            return Err(PathtimeError::oracle(
                "no feasible basis path exists; nothing to measure",
            ));
        }
        self.ctx.scratch.save_matrix("basis-matrix", &result.matrix)?;
        for path in result.all_paths() {
            if let Some(problem) = &path.ilp_problem {
                self.ctx
                    .scratch
                    .dump_query(&format!("query-{}", path.id), problem)?;
            }
        }

        for path in result
            .paths
            .iter_mut()
            .chain(result.extra_paths.iter_mut())
        {
            checker.measure(&self.dag, path)?;
        }

        let estimate_info = estimate_edge_weights(&mut self.dag, &mut result)?;
        if estimate_info.max_error > 0.5 {
            warn!(
                max_error = estimate_info.max_error,
                "basis predictions deviate from measurements"
            );
        }

        let (mu_max, error_bound) = if config.over_complete_basis {
            self.fit_overcomplete(&result)?
        } else {
            (None, None)
        };

        let (estimate, worst_path, worst_measured) = if config.ob_extraction {
            self.extract_via_delta(&result, mu_max.unwrap_or(0.0))?
        } else {
            self.extract_via_weights(&checker)?
        };

        self.ctx
            .scratch
            .save_dot("weighted", &self.dag, Some(&ControlFlowDag::edges_of(&worst_path)))?;

        let report = WcetReport {
            estimate,
            worst_path,
            worst_measured,
            basis_dimension: result.matrix.dim(),
            num_bad_rows: result.num_bad_rows,
            refined_rows,
            max_prediction_error: estimate_info.max_error,
            mu_max,
            error_bound,
            num_paths_total: self.dag.num_paths(),
        };
        info!(
            estimate = report.estimate,
            bad_rows = report.num_bad_rows,
            error = report.max_prediction_error,
            "analysis finished"
        );
        Ok(report)
    }

    /// Standard extraction: longest feasible path under the reconstructed
    /// weights, then one measurement of that path.
    fn extract_via_weights(
        &mut self,
        checker: &FeasibilityChecker<'_>,
    ) -> Result<(f64, Vec<NodeId>, Option<u64>)> {
        let config = &self.ctx.config;
        let mut worst = {
            let mut enumerator = PathEnumerator::new(
                &mut self.dag,
                config,
                self.ctx.solver.as_ref(),
                checker,
                &mut self.store,
            );
            enumerator
                .generate_paths(GenerationMode::WorstCase, 1, None)?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    PathtimeError::oracle("no feasible path survives the accumulated constraints")
                })?
        };
        checker.measure(&self.dag, &mut worst)?;
        let estimate = match worst.predicted {
            Some(value) if self.dag.num_nodes() > 1 => value,
            _ => worst.measured_value(),
        };
        if let Some(problem) = &worst.ilp_problem {
            self.ctx.scratch.save_problem("worst-path", problem)?;
        }
        Ok((estimate, worst.nodes, worst.measured))
    }

    /// Overcomplete extraction: the longest path any weighting compatible
    /// with the measurements (up to `mu_max` slack) can produce.
    fn extract_via_delta(
        &mut self,
        result: &BasisResult,
        mu_max: f64,
    ) -> Result<(f64, Vec<NodeId>, Option<u64>)> {
        let (paths, measured) = measured_views(result);
        let found = find_longest_path_with_delta(
            &self.dag,
            &self.store,
            self.ctx.solver.as_ref(),
            &paths,
            &measured,
            mu_max,
            "ob-extraction",
        )?
        .ok_or_else(|| {
            PathtimeError::ilp("delta-compatible model admits no path despite measured basis")
        })?;
        self.ctx.scratch.save_problem("ob-extraction", &found.problem)?;
        Ok((found.objective, found.nodes, None))
    }

    /// Fit `mu_max` and the scaled error bound for overcomplete mode.
    fn fit_overcomplete(&self, result: &BasisResult) -> Result<(Option<f64>, Option<f64>)> {
        let (paths, measured) = measured_views(result);
        let mu_max = find_least_compatible_mu_max(
            &self.dag,
            self.ctx.solver.as_ref(),
            &paths,
            &measured,
        )?;
        let worst_unit = find_worst_expressible_path(
            &self.dag,
            &self.store,
            self.ctx.solver.as_ref(),
            &paths,
            "worst-expressible",
        )?;
        let error_bound = worst_unit.map(|found| {
            found.objective * mu_max * self.ctx.config.maximum_error_scale_factor
        });
        Ok((Some(mu_max), error_bound))
    }

    /// Enumerate feasible paths after a run, reusing the reconstructed
    /// weights and accumulated constraints.
    pub fn generate_paths(
        &mut self,
        mode: GenerationMode,
        num_paths: usize,
        interval: Option<&Interval>,
    ) -> Result<Vec<Path>> {
        let checker = FeasibilityChecker::new(
            self.ctx.oracle.as_ref(),
            self.ctx.measurer.as_ref(),
            self.ctx.config.measurement_repeats,
        );
        let mut enumerator = PathEnumerator::new(
            &mut self.dag,
            &self.ctx.config,
            self.ctx.solver.as_ref(),
            &checker,
            &mut self.store,
        );
        enumerator.generate_paths(mode, num_paths, interval)
    }
}

/// Edge lists and measured lengths of every feasible path in the result.
fn measured_views(result: &BasisResult) -> (Vec<Vec<crate::shared::models::Edge>>, Vec<f64>) {
    let mut paths = Vec::new();
    let mut measured = Vec::new();
    for path in result.all_paths() {
        paths.push(path.edges.clone());
        measured.push(path.measured_value());
    }
    (paths, measured)
}
