//! Extreme-path queries over the weighted DAG.
//!
//! A query asks for the source-to-sink path whose weighted length is
//! extremal in absolute value. Because cofactor weights carry sign, both a
//! maximization and a minimization run; the winner is the solution with the
//! larger magnitude for a longest query and the smaller magnitude for a
//! shortest query.
//!
//! Models are built over the compacted DAG, one binary per segment, with
//! unit flow from source to sink and the persistent exclusive and bundled
//! constraints mapped through the edge-to-segment index.

use tracing::{debug, instrument};

use crate::errors::{PathtimeError, Result};
use crate::features::dag::domain::ControlFlowDag;
use crate::features::ilp::domain::{
    Cmp, ConstraintStore, IlpOutcome, IlpProblem, LinExpr, Sense, VarId,
};
use crate::features::ilp::infrastructure::compact::CompactDag;
use crate::features::ilp::ports::IlpSolver;
use crate::shared::models::{Interval, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Longest,
    Shortest,
}

/// A solved extreme-path query.
#[derive(Debug, Clone)]
pub struct ExtremePath {
    pub nodes: Vec<NodeId>,
    pub objective: f64,
    /// The winning model, kept for debug artifacts.
    pub problem: IlpProblem,
}

/// Find the extremal feasible path, or `None` when the accumulated
/// constraints rule every path out.
#[instrument(skip_all, fields(query = query_name, ?extremum))]
pub fn find_extreme_path(
    dag: &ControlFlowDag,
    store: &ConstraintStore,
    solver: &dyn IlpSolver,
    extremum: Extremum,
    interval: Option<&Interval>,
    query_name: &str,
) -> Result<Option<ExtremePath>> {
    if dag.num_nodes() == 1 {
        return Ok(Some(ExtremePath {
            nodes: vec![dag.source().clone()],
            objective: 0.0,
            problem: IlpProblem::new(query_name, Sense::Maximize),
        }));
    }

    let compact = CompactDag::from_dag(dag)?;
    let max_run = solve_one(&compact, store, solver, interval, query_name, Sense::Maximize)?;
    let min_run = solve_one(&compact, store, solver, interval, query_name, Sense::Minimize)?;

    let chosen = match (max_run, min_run) {
        (None, None) => return Ok(None),
        (Some(run), None) | (None, Some(run)) => run,
        (Some(max_run), Some(min_run)) => {
            let prefer_max = match extremum {
                Extremum::Longest => max_run.0.abs() >= min_run.0.abs(),
                Extremum::Shortest => max_run.0.abs() < min_run.0.abs(),
            };
            if prefer_max {
                max_run
            } else {
                min_run
            }
        }
    };
    let (objective, selected, problem) = chosen;
    let nodes = compact.thread_path(&selected).ok_or_else(|| {
        PathtimeError::ilp("selected segments do not form a source-to-sink path")
    })?;
    debug!(objective, len = nodes.len(), "extreme path found");
    Ok(Some(ExtremePath {
        nodes,
        objective,
        problem,
    }))
}

type SolvedRun = (f64, Vec<usize>, IlpProblem);

fn solve_one(
    compact: &CompactDag,
    store: &ConstraintStore,
    solver: &dyn IlpSolver,
    interval: Option<&Interval>,
    query_name: &str,
    sense: Sense,
) -> Result<Option<SolvedRun>> {
    let (problem, vars) = build_core_problem(compact, store, interval, query_name, sense)?;
    match solver.solve(&problem)? {
        IlpOutcome::NoSolution => Ok(None),
        IlpOutcome::Optimal {
            objective,
            assignment,
        } => {
            let selected: Vec<usize> = vars
                .iter()
                .enumerate()
                .filter(|(_, v)| assignment[v.0] > 0.5)
                .map(|(i, _)| i)
                .collect();
            Ok(Some((objective, selected, problem)))
        }
    }
}

/// One binary per segment, unit flow, persistent constraints, optional
/// interval pin on the objective value.
fn build_core_problem(
    compact: &CompactDag,
    store: &ConstraintStore,
    interval: Option<&Interval>,
    query_name: &str,
    sense: Sense,
) -> Result<(IlpProblem, Vec<VarId>)> {
    let suffix = match sense {
        Sense::Maximize => "max",
        Sense::Minimize => "min",
    };
    let mut problem = IlpProblem::new(format!("{query_name}-{suffix}"), sense);
    let vars: Vec<VarId> = compact
        .segments
        .iter()
        .enumerate()
        .map(|(i, _)| problem.add_binary(format!("s{i}")))
        .collect();

    let mut objective = LinExpr::new();
    for (i, segment) in compact.segments.iter().enumerate() {
        objective.add_term(vars[i], segment.weight);
    }
    problem.set_objective(objective.clone(), sense);

    // Unit flow from source to sink, conservation elsewhere.
    for junction in &compact.junctions {
        let outgoing = compact.segments_out(junction);
        let incoming = compact.segments_in(junction);
        if junction == &compact.source {
            problem.add_constraint(
                "flow_source",
                LinExpr::sum(outgoing.iter().map(|&i| vars[i])),
                Cmp::Eq,
                1.0,
            );
        } else if junction == &compact.sink {
            problem.add_constraint(
                "flow_sink",
                LinExpr::sum(incoming.iter().map(|&i| vars[i])),
                Cmp::Eq,
                1.0,
            );
        } else {
            let mut balance = LinExpr::new();
            for &i in &incoming {
                balance.add_term(vars[i], 1.0);
            }
            for &i in &outgoing {
                balance.add_term(vars[i], -1.0);
            }
            problem.add_constraint(format!("flow_{junction}"), balance, Cmp::Eq, 0.0);
        }
    }

    // Exclusive sets: the path may not take every edge of the set at once.
    for (k, edges) in store.exclusive_sets().iter().enumerate() {
        let mut expr = LinExpr::new();
        for edge in edges {
            let seg = compact.segment_of(edge).ok_or_else(|| {
                PathtimeError::ilp(format!("constraint references unknown edge {edge}"))
            })?;
            expr.add_term(vars[seg], 1.0);
        }
        problem.add_constraint(
            format!("exclusive_{k}"),
            expr,
            Cmp::Le,
            edges.len() as f64 - 1.0,
        );
    }

    // Bundled sets: all edges taken together with the anchor, or none.
    for (k, edges) in store.bundled_sets().iter().enumerate() {
        let anchor = compact.segment_of(&edges[0]).ok_or_else(|| {
            PathtimeError::ilp(format!("constraint references unknown edge {}", edges[0]))
        })?;
        let mut expr = LinExpr::new();
        for edge in &edges[1..] {
            let seg = compact.segment_of(edge).ok_or_else(|| {
                PathtimeError::ilp(format!("constraint references unknown edge {edge}"))
            })?;
            expr.add_term(vars[seg], 1.0);
        }
        expr.add_term(vars[anchor], -(edges.len() as f64 - 1.0));
        problem.add_constraint(format!("bundled_{k}"), expr, Cmp::Eq, 0.0);
    }

    if let Some(interval) = interval {
        if let Some(lower) = interval.lower_bound() {
            problem.add_constraint("value_lower", objective.clone(), Cmp::Ge, lower);
        }
        if let Some(upper) = interval.upper_bound() {
            problem.add_constraint("value_upper", objective, Cmp::Le, upper);
        }
    }
    Ok((problem, vars))
}
