//! Feasible-path enumeration over the weighted DAG.
//!
//! Extremal modes repeat the extreme-path query, excluding each returned
//! path before the next round, so paths arrive ordered by weighted length.
//! Random mode samples walks and pins each one into the ILP as a bundled
//! set, which validates the walk against the persistent constraints and the
//! optional value interval. All constraints added during a call are rolled
//! back before returning.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use tracing::{debug, info, instrument};

use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::dag::domain::ControlFlowDag;
use crate::features::enumerator::domain::GenerationMode;
use crate::features::feasibility::application::{CheckOutcome, FeasibilityChecker};
use crate::features::feasibility::domain::Path;
use crate::features::ilp::domain::ConstraintStore;
use crate::features::ilp::infrastructure::extreme_path::{find_extreme_path, Extremum};
use crate::features::ilp::ports::IlpSolver;
use crate::shared::models::{Interval, PathId};

/// Random mode gives up after this many fruitless walks per requested path.
const RANDOM_ATTEMPT_FACTOR: usize = 10;

pub struct PathEnumerator<'a> {
    dag: &'a mut ControlFlowDag,
    config: &'a AnalysisConfig,
    solver: &'a dyn IlpSolver,
    checker: &'a FeasibilityChecker<'a>,
    store: &'a mut ConstraintStore,
    next_path_id: u64,
}

impl<'a> PathEnumerator<'a> {
    pub fn new(
        dag: &'a mut ControlFlowDag,
        config: &'a AnalysisConfig,
        solver: &'a dyn IlpSolver,
        checker: &'a FeasibilityChecker<'a>,
        store: &'a mut ConstraintStore,
    ) -> Self {
        PathEnumerator {
            dag,
            config,
            solver,
            checker,
            store,
            next_path_id: 0,
        }
    }

    fn fresh_id(&mut self) -> PathId {
        let id = PathId(self.next_path_id);
        self.next_path_id += 1;
        id
    }

    /// Generate up to `num_paths` feasible paths in the given mode. The
    /// exhaustive modes ignore `num_paths` and stop only when the query
    /// runs dry or the total path count is reached.
    #[instrument(skip_all, fields(?mode, num_paths))]
    pub fn generate_paths(
        &mut self,
        mode: GenerationMode,
        num_paths: usize,
        interval: Option<&Interval>,
    ) -> Result<Vec<Path>> {
        let saved_exclusive = self.store.num_exclusive();
        let saved_bundled = self.store.num_bundled();
        let outcome = match mode {
            GenerationMode::WorstCase => {
                self.generate_extremal(Extremum::Longest, num_paths, interval)
            }
            GenerationMode::BestCase => {
                self.generate_extremal(Extremum::Shortest, num_paths, interval)
            }
            GenerationMode::AllDecreasing => {
                self.generate_extremal(Extremum::Longest, usize::MAX, interval)
            }
            GenerationMode::AllIncreasing => {
                self.generate_extremal(Extremum::Shortest, usize::MAX, interval)
            }
            GenerationMode::Random => self.generate_random(num_paths, interval),
        };
        self.store.truncate_exclusive(saved_exclusive);
        self.store.truncate_bundled(saved_bundled);
        outcome
    }

    fn generate_extremal(
        &mut self,
        extremum: Extremum,
        num_paths: usize,
        interval: Option<&Interval>,
    ) -> Result<Vec<Path>> {
        let target = num_paths.min(usize::try_from(self.dag.num_paths()).unwrap_or(usize::MAX));
        let mut paths = Vec::new();
        while paths.len() < target {
            let found = find_extreme_path(
                self.dag,
                self.store,
                self.solver,
                extremum,
                interval,
                "enumerate",
            )?;
            let Some(found) = found else {
                debug!(collected = paths.len(), "path query ran dry");
                break;
            };
            let id = self.fresh_id();
            let mut path = Path::from_nodes(self.dag, id, found.nodes)?;
            match self.checker.check_and_measure(self.dag, &mut path)? {
                CheckOutcome::Feasible => {
                    self.store.add_exclusive(path.edges.clone());
                    path.predicted = Some(found.objective);
                    path.ilp_problem = Some(found.problem);
                    paths.push(path);
                }
                CheckOutcome::Infeasible { exclusion } => {
                    self.store.add_exclusive(exclusion);
                }
            }
            if self.dag.num_nodes() == 1 {
                // The trivial graph has one path and no way to exclude it.
                break;
            }
        }
        info!(collected = paths.len(), "extremal enumeration finished");
        Ok(paths)
    }

    /// Sample distinct feasible paths by random walks. Each walk becomes a
    /// bundled set; if the pinned query has no solution the walk violates a
    /// persistent constraint or the interval and is skipped.
    fn generate_random(
        &mut self,
        num_paths: usize,
        interval: Option<&Interval>,
    ) -> Result<Vec<Path>> {
        let mut rng = StdRng::seed_from_u64(self.config.random_seed);
        if self.dag.num_nodes() == 1 {
            let id = self.fresh_id();
            let mut path = Path::from_nodes(self.dag, id, vec![self.dag.source().clone()])?;
            return Ok(match self.checker.check_and_measure(self.dag, &mut path)? {
                CheckOutcome::Feasible => vec![path],
                CheckOutcome::Infeasible { .. } => Vec::new(),
            });
        }
        let target = num_paths.min(usize::try_from(self.dag.num_paths()).unwrap_or(usize::MAX));
        let budget = target.saturating_mul(RANDOM_ATTEMPT_FACTOR).max(1);
        let mut seen: FxHashSet<Vec<u8>> = FxHashSet::default();
        let mut paths = Vec::new();

        for _ in 0..budget {
            if paths.len() >= target {
                break;
            }
            let walk = self.dag.random_path(&mut rng);
            let edges = ControlFlowDag::edges_of(&walk);
            let key: Vec<u8> = self
                .dag
                .compress_path(&edges)
                .iter()
                .map(|&x| x as u8)
                .collect();
            if !seen.insert(key) {
                continue;
            }

            // Pin the walk: forbid every other source edge, then bundle the
            // walk's edges to its first edge. Unit flow does the rest.
            let saved_bundled = self.store.num_bundled();
            let saved_exclusive = self.store.num_exclusive();
            for out in self.dag.out_edges(self.dag.source()) {
                if out != edges[0] {
                    self.store.add_exclusive(vec![out]);
                }
            }
            self.store.add_bundled(edges);
            let pinned = find_extreme_path(
                self.dag,
                self.store,
                self.solver,
                Extremum::Longest,
                interval,
                "random-pin",
            )?;
            self.store.truncate_bundled(saved_bundled);
            self.store.truncate_exclusive(saved_exclusive);
            let Some(pinned) = pinned else {
                debug!("random walk violates constraints, skipped");
                continue;
            };
            let id = self.fresh_id();
            let mut path = Path::from_nodes(self.dag, id, pinned.nodes)?;
            match self.checker.check_and_measure(self.dag, &mut path)? {
                CheckOutcome::Feasible => {
                    path.predicted = Some(pinned.objective);
                    paths.push(path);
                }
                CheckOutcome::Infeasible { exclusion } => {
                    self.store.add_exclusive(exclusion);
                }
            }
        }
        info!(collected = paths.len(), "random enumeration finished");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dag::domain::CfgNode;
    use crate::features::feasibility::infrastructure::{ScriptedMeasurer, ScriptedOracle};
    use crate::features::ilp::infrastructure::solvers::BranchBoundSolver;
    use crate::shared::models::Edge;

    fn node(id: &str) -> CfgNode {
        CfgNode {
            id: id.to_string(),
            label: String::new(),
        }
    }

    /// Two-diamond DAG with weights making path lengths 1..4 distinct.
    fn weighted_two_diamond() -> ControlFlowDag {
        let mut dag = ControlFlowDag::from_parts(
            vec![
                node("a"),
                node("b"),
                node("c"),
                node("d"),
                node("e"),
                node("f"),
                node("g"),
            ],
            vec![
                Edge::new("a", "b"),
                Edge::new("a", "c"),
                Edge::new("b", "d"),
                Edge::new("c", "d"),
                Edge::new("d", "e"),
                Edge::new("d", "f"),
                Edge::new("e", "g"),
                Edge::new("f", "g"),
            ],
            false,
        )
        .unwrap();
        let mut set = |s: &str, t: &str, w: f64| {
            let idx = dag.edge_index(&Edge::new(s, t)).unwrap();
            dag.edge_weights[idx] = w;
        };
        set("a", "b", 10.0);
        set("a", "c", 1.0);
        set("d", "e", 5.0);
        set("d", "f", 2.0);
        dag
    }

    fn harness<'x>(
        oracle: &'x ScriptedOracle,
        measurer: &'x ScriptedMeasurer,
    ) -> FeasibilityChecker<'x> {
        FeasibilityChecker::new(oracle, measurer, 1)
    }

    #[test]
    fn test_worst_case_orders_by_decreasing_length() {
        let mut dag = weighted_two_diamond();
        let config = AnalysisConfig::default();
        let oracle = ScriptedOracle::feasible_everywhere();
        let measurer = ScriptedMeasurer::new();
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        let paths = enumerator
            .generate_paths(GenerationMode::WorstCase, 3, None)
            .unwrap();
        assert_eq!(paths.len(), 3);
        let lengths: Vec<f64> = paths.iter().map(|p| p.predicted.unwrap()).collect();
        assert_eq!(lengths, vec![15.0, 12.0, 6.0]);
        assert_eq!(paths[0].nodes, vec!["a", "b", "d", "e", "g"]);
    }

    #[test]
    fn test_accepted_paths_are_measured() {
        let mut dag = weighted_two_diamond();
        let config = AnalysisConfig::default();
        let oracle = ScriptedOracle::feasible_everywhere();
        let measurer = ScriptedMeasurer::new()
            .with_edge_cost(Edge::new("a", "b"), 10)
            .with_edge_cost(Edge::new("d", "e"), 5);
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        let paths = enumerator
            .generate_paths(GenerationMode::WorstCase, 2, None)
            .unwrap();
        // Every accepted path carries a measurement alongside its prediction.
        assert_eq!(paths[0].measured, Some(15));
        assert_eq!(paths[1].measured, Some(10));
    }

    #[test]
    fn test_all_increasing_enumerates_everything() {
        let mut dag = weighted_two_diamond();
        let config = AnalysisConfig::default();
        let oracle = ScriptedOracle::feasible_everywhere();
        let measurer = ScriptedMeasurer::new();
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        let paths = enumerator
            .generate_paths(GenerationMode::AllIncreasing, 1, None)
            .unwrap();
        let lengths: Vec<f64> = paths.iter().map(|p| p.predicted.unwrap()).collect();
        assert_eq!(lengths, vec![3.0, 6.0, 12.0, 15.0]);
    }

    #[test]
    fn test_infeasible_paths_are_skipped() {
        let mut dag = weighted_two_diamond();
        let config = AnalysisConfig::default();
        // The heaviest path (b then e) is infeasible.
        let oracle = ScriptedOracle::feasible_everywhere()
            .with_conflict(Edge::new("a", "b"), Edge::new("d", "e"));
        let measurer = ScriptedMeasurer::new();
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        let paths = enumerator
            .generate_paths(GenerationMode::WorstCase, 2, None)
            .unwrap();
        let lengths: Vec<f64> = paths.iter().map(|p| p.predicted.unwrap()).collect();
        assert_eq!(lengths, vec![12.0, 6.0]);
    }

    #[test]
    fn test_constraints_roll_back_after_enumeration() {
        let mut dag = weighted_two_diamond();
        let config = AnalysisConfig::default();
        let oracle = ScriptedOracle::feasible_everywhere();
        let measurer = ScriptedMeasurer::new();
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        store.add_exclusive(vec![Edge::new("a", "b")]);
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        enumerator
            .generate_paths(GenerationMode::AllDecreasing, 1, None)
            .unwrap();
        // Only the pre-existing constraint survives.
        assert_eq!(store.num_exclusive(), 1);
        assert_eq!(store.num_bundled(), 0);
    }

    #[test]
    fn test_random_mode_returns_distinct_feasible_paths() {
        let mut dag = weighted_two_diamond();
        let mut config = AnalysisConfig::default();
        config.random_seed = 3;
        let oracle = ScriptedOracle::feasible_everywhere();
        let measurer = ScriptedMeasurer::new();
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        let paths = enumerator
            .generate_paths(GenerationMode::Random, 3, None)
            .unwrap();
        assert!(!paths.is_empty());
        assert!(paths.len() <= 3);
        let mut keys: Vec<&Vec<f64>> = paths.iter().map(|p| &p.compressed).collect();
        keys.sort_by(|a, b| a.partial_cmp(b).unwrap());
        keys.dedup();
        assert_eq!(keys.len(), paths.len());
    }

    #[test]
    fn test_random_mode_is_deterministic_for_a_fixed_seed() {
        let run = || {
            let mut dag = weighted_two_diamond();
            let mut config = AnalysisConfig::default();
            config.random_seed = 7;
            let oracle = ScriptedOracle::feasible_everywhere();
            let measurer = ScriptedMeasurer::new();
            let checker = harness(&oracle, &measurer);
            let solver = BranchBoundSolver::new();
            let mut store = ConstraintStore::new();
            let mut enumerator =
                PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
            enumerator
                .generate_paths(GenerationMode::Random, 2, None)
                .unwrap()
                .into_iter()
                .map(|p| p.nodes)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_interval_filters_paths() {
        let mut dag = weighted_two_diamond();
        let config = AnalysisConfig::default();
        let oracle = ScriptedOracle::feasible_everywhere();
        let measurer = ScriptedMeasurer::new();
        let checker = harness(&oracle, &measurer);
        let solver = BranchBoundSolver::new();
        let mut store = ConstraintStore::new();
        let mut enumerator =
            PathEnumerator::new(&mut dag, &config, &solver, &checker, &mut store);
        let interval = Interval::bounded(5.0, 13.0);
        let paths = enumerator
            .generate_paths(GenerationMode::AllDecreasing, 1, Some(&interval))
            .unwrap();
        let lengths: Vec<f64> = paths.iter().map(|p| p.predicted.unwrap()).collect();
        assert_eq!(lengths, vec![12.0, 6.0]);
    }
}
