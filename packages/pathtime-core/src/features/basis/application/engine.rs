//! Feasible basis-path construction.
//!
//! Phase A fills the rows of an identity-seeded basis matrix greedily: for
//! each row, cofactor weights turn the extreme-path ILP objective into the
//! determinant the matrix would have after replacing that row, so the
//! solver proposes the determinant-maximizing candidate directly. UNSAT
//! candidates add an exclusion constraint and the row retries; rows whose
//! candidates dry up, fall under the determinant threshold, or exhaust the
//! UNSAT budget are demoted to the bottom as bad rows.
//!
//! Phase B sweeps the surviving rows, replacing a row only when a fresh
//! candidate more than doubles the determinant magnitude and proves
//! feasible. One row is considered per step, commit or rollback, and the
//! cursor always advances exactly once; sweeps repeat until a full pass
//! replaces nothing, since a later replacement can re-open an earlier row.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use tracing::{debug, info, instrument, warn};

use crate::config::AnalysisConfig;
use crate::errors::{PathtimeError, Result};
use crate::features::basis::domain::matrix::BasisMatrix;
use crate::features::basis::domain::weights::{apply_reduced_weights, cofactor_weights};
use crate::features::dag::domain::ControlFlowDag;
use crate::features::feasibility::application::{CheckOutcome, FeasibilityChecker};
use crate::features::feasibility::domain::{Path, WitnessInputs};
use crate::features::ilp::domain::ConstraintStore;
use crate::features::ilp::infrastructure::expressible::find_worst_expressible_path;
use crate::features::ilp::infrastructure::extreme_path::{find_extreme_path, ExtremePath, Extremum};
use crate::features::ilp::ports::IlpSolver;
use crate::shared::models::{Edge, NodeId, PathId};

/// Outcome of basis construction.
#[derive(Debug)]
pub struct BasisResult {
    pub matrix: BasisMatrix,
    /// Feasible basis paths, parallel to the leading matrix rows.
    pub paths: Vec<Path>,
    /// Trailing rows that no feasible candidate could fill.
    pub num_bad_rows: usize,
    /// Extra feasible paths collected in overcomplete mode.
    pub extra_paths: Vec<Path>,
}

impl BasisResult {
    pub fn num_good_rows(&self) -> usize {
        self.matrix.dim() - self.num_bad_rows
    }

    /// All feasible paths: basis rows plus overcomplete extras.
    pub fn all_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().chain(self.extra_paths.iter())
    }
}

/// Cached oracle verdicts keyed by node sequence, so refinement does not
/// re-query paths the construction phase already settled. Feasible entries
/// keep the witness so a re-harvested path can still be replayed.
#[derive(Debug, Clone)]
enum CachedVerdict {
    Feasible(Option<WitnessInputs>),
    Infeasible(Vec<Edge>),
}

type VerdictCache = FxHashMap<Vec<NodeId>, CachedVerdict>;

pub struct BasisEngine<'a> {
    dag: &'a mut ControlFlowDag,
    config: &'a AnalysisConfig,
    solver: &'a dyn IlpSolver,
    checker: &'a FeasibilityChecker<'a>,
    store: &'a mut ConstraintStore,
    next_path_id: u64,
    cache: VerdictCache,
}

impl<'a> BasisEngine<'a> {
    pub fn new(
        dag: &'a mut ControlFlowDag,
        config: &'a AnalysisConfig,
        solver: &'a dyn IlpSolver,
        checker: &'a FeasibilityChecker<'a>,
        store: &'a mut ConstraintStore,
    ) -> Self {
        BasisEngine {
            dag,
            config,
            solver,
            checker,
            store,
            next_path_id: 0,
            cache: VerdictCache::default(),
        }
    }

    fn fresh_id(&mut self) -> PathId {
        let id = PathId(self.next_path_id);
        self.next_path_id += 1;
        id
    }

    /// Phase A: greedy construction of a feasible basis.
    #[instrument(skip_all)]
    pub fn generate_basis_paths(&mut self) -> Result<BasisResult> {
        if self.dag.num_nodes() == 1 {
            return self.trivial_basis();
        }

        let b = self.dag.path_dimension();
        let mut matrix = BasisMatrix::identity(b);
        if self.config.randomize_initial_basis {
            let mut rng = StdRng::seed_from_u64(self.config.random_seed);
            matrix.shuffle_rows(&mut rng);
        }

        let mut paths: Vec<Path> = Vec::new();
        let mut num_bad_rows = 0usize;
        let mut current_row = 0usize;
        let mut unsat_this_row = 0u32;

        while current_row < b - num_bad_rows {
            let candidate = self.best_candidate_for_row(&matrix, current_row)?;
            let Some(found) = candidate else {
                warn!(row = current_row, "no candidate path left for row, demoting");
                demote_row(&mut matrix, current_row, b, &mut num_bad_rows);
                unsat_this_row = 0;
                continue;
            };
            let new_det = found.objective;

            if new_det.abs() <= self.config.determinant_threshold {
                debug!(
                    row = current_row,
                    det = new_det,
                    "candidate determinant below threshold, demoting row"
                );
                demote_row(&mut matrix, current_row, b, &mut num_bad_rows);
                unsat_this_row = 0;
                continue;
            }

            let id = self.fresh_id();
            let mut path = Path::from_nodes(self.dag, id, found.nodes)?;
            match self.check_cached(&mut path)? {
                CheckOutcome::Feasible => {
                    matrix.set_row(current_row, &path.compressed);
                    debug!(row = current_row, path = %path.id, det = new_det, "basis row committed");
                    path.ilp_problem = Some(found.problem);
                    paths.push(path);
                    current_row += 1;
                    unsat_this_row = 0;
                }
                CheckOutcome::Infeasible { exclusion } => {
                    self.store.add_exclusive(exclusion);
                    unsat_this_row += 1;
                    if unsat_this_row >= self.config.max_infeasible_paths {
                        warn!(
                            row = current_row,
                            attempts = unsat_this_row,
                            "UNSAT budget exhausted, demoting row"
                        );
                        demote_row(&mut matrix, current_row, b, &mut num_bad_rows);
                        unsat_this_row = 0;
                    }
                }
            }
        }

        info!(
            dimension = b,
            good_rows = b - num_bad_rows,
            bad_rows = num_bad_rows,
            "basis construction finished"
        );
        Ok(BasisResult {
            matrix,
            paths,
            num_bad_rows,
            extra_paths: Vec::new(),
        })
    }

    /// Phase B: refinement sweeps over the good rows until a full pass
    /// replaces nothing. Returns the total number of replacements.
    #[instrument(skip_all)]
    pub fn refine_basis(&mut self, result: &mut BasisResult) -> Result<usize> {
        if self.config.prevent_basis_refinement || self.dag.num_nodes() == 1 {
            return Ok(0);
        }
        let mut total = 0usize;
        loop {
            let replaced = self.refine_pass(result)?;
            total += replaced;
            if replaced == 0 {
                break;
            }
        }
        info!(replaced = total, "basis refinement finished");
        Ok(total)
    }

    /// One sweep; a replacement at a later row can re-open an earlier one,
    /// so the caller repeats this until it comes back empty.
    fn refine_pass(&mut self, result: &mut BasisResult) -> Result<usize> {
        let good_rows = result.num_good_rows().min(result.paths.len());
        let mut replaced = 0usize;
        for row in 0..good_rows {
            let current_det = result.matrix.det_abs();
            let candidate = self.best_candidate_for_row(&result.matrix, row)?;
            let Some(found) = candidate else {
                continue;
            };
            let new_det = found.objective;
            if new_det.abs() <= 2.0 * current_det {
                continue;
            }
            let id = self.fresh_id();
            let mut path = Path::from_nodes(self.dag, id, found.nodes)?;
            match self.check_cached(&mut path)? {
                CheckOutcome::Feasible => {
                    result.matrix.set_row(row, &path.compressed);
                    debug!(
                        row,
                        old_det = current_det,
                        new_det,
                        "basis row refined"
                    );
                    path.ilp_problem = Some(found.problem);
                    result.paths[row] = path;
                    replaced += 1;
                }
                CheckOutcome::Infeasible { exclusion } => {
                    self.store.add_exclusive(exclusion);
                }
            }
            // The cursor moves on whether or not the row was replaced.
        }
        Ok(replaced)
    }

    /// Overcomplete mode: iterate the worst-expressible-path query and
    /// append each feasible result as an extra basis path until no
    /// expressible path exceeds `maximum_error_scale_factor`. Runs after
    /// refinement so the basis rows are final when the pins are laid down.
    pub fn extend_overcomplete(&mut self, result: &mut BasisResult) -> Result<()> {
        if self.dag.num_nodes() == 1 {
            return Ok(());
        }
        let k = self.config.maximum_error_scale_factor;
        let mut pinned: Vec<Vec<Edge>> =
            result.all_paths().map(|p| p.edges.clone()).collect();
        let mut unsat_count = 0u32;
        loop {
            let found = find_worst_expressible_path(
                self.dag,
                self.store,
                self.solver,
                &pinned,
                "overcomplete",
            )?;
            let Some(found) = found else {
                break;
            };
            if found.objective <= k {
                debug!(bound = found.objective, "expressibility bound reached");
                break;
            }
            let id = self.fresh_id();
            let mut path = Path::from_nodes(self.dag, id, found.nodes)?;
            if result
                .all_paths()
                .any(|p| p.compressed == path.compressed)
            {
                // A pinned path scores at most 1 <= k, so re-finding one
                // means the model cannot improve further.
                warn!(path = %path.id, "worst expressible path already pinned, stopping");
                break;
            }
            match self.check_cached(&mut path)? {
                CheckOutcome::Feasible => {
                    pinned.push(path.edges.clone());
                    path.ilp_problem = Some(found.problem);
                    result.extra_paths.push(path);
                    unsat_count = 0;
                }
                CheckOutcome::Infeasible { exclusion } => {
                    // Genuinely infeasible, so the exclusion stays for good.
                    self.store.add_exclusive(exclusion);
                    unsat_count += 1;
                    if unsat_count >= self.config.max_infeasible_paths {
                        warn!(
                            attempts = unsat_count,
                            "UNSAT budget exhausted during overcomplete extension"
                        );
                        break;
                    }
                }
            }
        }
        info!(extras = result.extra_paths.len(), "overcomplete extension finished");
        Ok(())
    }

    /// Cofactor-weighted extreme-path query for one row. The objective of
    /// the returned path is the determinant after replacement.
    fn best_candidate_for_row(
        &mut self,
        matrix: &BasisMatrix,
        row: usize,
    ) -> Result<Option<ExtremePath>> {
        let weights = cofactor_weights(matrix, row);
        apply_reduced_weights(self.dag, &weights);
        find_extreme_path(
            self.dag,
            self.store,
            self.solver,
            Extremum::Longest,
            None,
            &format!("basis-row-{row}"),
        )
    }

    fn check_cached(&mut self, path: &mut Path) -> Result<CheckOutcome> {
        if let Some(cached) = self.cache.get(&path.nodes) {
            return match cached {
                CachedVerdict::Feasible(witness) => {
                    path.status = crate::features::feasibility::domain::PathStatus::Feasible;
                    path.witness = witness.clone();
                    Ok(CheckOutcome::Feasible)
                }
                CachedVerdict::Infeasible(exclusion) => {
                    path.mark_infeasible();
                    Ok(CheckOutcome::Infeasible {
                        exclusion: exclusion.clone(),
                    })
                }
            };
        }
        let outcome = self.checker.check(self.dag, path)?;
        let entry = match &outcome {
            CheckOutcome::Feasible => CachedVerdict::Feasible(path.witness.clone()),
            CheckOutcome::Infeasible { exclusion } => {
                CachedVerdict::Infeasible(exclusion.clone())
            }
        };
        self.cache.insert(path.nodes.clone(), entry);
        Ok(outcome)
    }

    /// A single-node procedure has exactly one (empty) path.
    fn trivial_basis(&mut self) -> Result<BasisResult> {
        let id = self.fresh_id();
        let mut path = Path::from_nodes(self.dag, id, vec![self.dag.source().clone()])?;
        if self.check_cached(&mut path)? != CheckOutcome::Feasible {
            return Err(PathtimeError::oracle(
                "the only path of a single-node procedure is infeasible",
            ));
        }
        Ok(BasisResult {
            matrix: BasisMatrix::identity(1),
            paths: vec![path],
            num_bad_rows: 0,
            extra_paths: Vec::new(),
        })
    }
}

/// Swap a stuck row out of the active range.
fn demote_row(matrix: &mut BasisMatrix, row: usize, dim: usize, num_bad_rows: &mut usize) {
    let last_active = dim - 1 - *num_bad_rows;
    matrix.swap_rows(row, last_active);
    *num_bad_rows += 1;
}
