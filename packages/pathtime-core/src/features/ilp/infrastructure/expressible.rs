//! Expressibility queries for overcomplete bases.
//!
//! These models treat edge weights themselves as free-sign variables and
//! ask what path lengths the measured basis still admits. Products of a
//! weight and a path indicator are linearized with big-M rows; since the
//! objective always maximizes the products, upper-bounding rows suffice.
//!
//! Unlike the core path queries these run over raw edges, because the
//! weight variables are per edge rather than fixed coefficients.

use tracing::{debug, instrument};

use crate::errors::{PathtimeError, Result};
use crate::features::dag::domain::ControlFlowDag;
use crate::features::ilp::domain::{
    Cmp, ConstraintStore, IlpOutcome, IlpProblem, LinExpr, Sense, VarId, VarKind,
};
use crate::features::ilp::infrastructure::extreme_path::ExtremePath;
use crate::features::ilp::ports::IlpSolver;
use crate::shared::models::{Edge, NodeId};

/// Magnitude cap on a single edge weight when basis lengths are pinned to
/// the unit interval.
const UNIT_WEIGHT_BOUND: f64 = 10.0;

/// The worst path length expressible by any weighting under which every
/// basis path has length in `[-1, 1]`.
#[instrument(skip_all, fields(query = query_name))]
pub fn find_worst_expressible_path(
    dag: &ControlFlowDag,
    store: &ConstraintStore,
    solver: &dyn IlpSolver,
    basis_paths: &[Vec<Edge>],
    query_name: &str,
) -> Result<Option<ExtremePath>> {
    let pins: Vec<(f64, f64)> = basis_paths.iter().map(|_| (-1.0, 1.0)).collect();
    solve_weighted_path_model(
        dag,
        store,
        solver,
        basis_paths,
        &pins,
        UNIT_WEIGHT_BOUND,
        query_name,
    )
}

/// The longest path length expressible by a weighting that reproduces each
/// measured basis length to within `delta * 1.01`.
#[instrument(skip_all, fields(query = query_name, delta))]
pub fn find_longest_path_with_delta(
    dag: &ControlFlowDag,
    store: &ConstraintStore,
    solver: &dyn IlpSolver,
    basis_paths: &[Vec<Edge>],
    measured: &[f64],
    delta: f64,
    query_name: &str,
) -> Result<Option<ExtremePath>> {
    if basis_paths.len() != measured.len() {
        return Err(PathtimeError::ilp(
            "one measured length is required per basis path",
        ));
    }
    // The slack absorbs round-off in the measured deltas.
    let tolerance = delta * 1.01;
    let pins: Vec<(f64, f64)> = measured
        .iter()
        .map(|len| (len - tolerance, len + tolerance))
        .collect();
    let max_abs = measured.iter().fold(0.0_f64, |a, v| a.max(v.abs()));
    let weight_bound = 10.0 * (1.0 + max_abs);
    solve_weighted_path_model(dag, store, solver, basis_paths, &pins, weight_bound, query_name)
}

/// The smallest `mu` such that some weighting reproduces every measured
/// basis length to within `mu`. A pure LP.
#[instrument(skip_all)]
pub fn find_least_compatible_mu_max(
    dag: &ControlFlowDag,
    solver: &dyn IlpSolver,
    basis_paths: &[Vec<Edge>],
    measured: &[f64],
) -> Result<f64> {
    if basis_paths.len() != measured.len() {
        return Err(PathtimeError::ilp(
            "one measured length is required per basis path",
        ));
    }
    let max_abs = measured.iter().fold(0.0_f64, |a, v| a.max(v.abs()));
    let weight_bound = 2.0_f64.max(2.0 * max_abs);

    let mut problem = IlpProblem::new("mu-max", Sense::Minimize);
    let weights: Vec<VarId> = dag
        .all_edges()
        .iter()
        .enumerate()
        .map(|(i, _)| {
            problem.add_variable(format!("w{i}"), VarKind::Continuous, -weight_bound, weight_bound)
        })
        .collect();
    // Weights of zero give mu = max |measured|, so that bounds the optimum.
    let mu = problem.add_variable("mu", VarKind::Continuous, 0.0, max_abs + 1.0);
    problem.set_objective(LinExpr::term(mu, 1.0), Sense::Minimize);

    for (i, (path, len)) in basis_paths.iter().zip(measured).enumerate() {
        let mut above = LinExpr::new();
        let mut below = LinExpr::new();
        for edge in path {
            let idx = edge_index(dag, edge)?;
            above.add_term(weights[idx], 1.0);
            below.add_term(weights[idx], 1.0);
        }
        above.add_term(mu, -1.0);
        below.add_term(mu, 1.0);
        problem.add_constraint(format!("fit_hi_{i}"), above, Cmp::Le, *len);
        problem.add_constraint(format!("fit_lo_{i}"), below, Cmp::Ge, *len);
    }

    match solver.solve(&problem)? {
        IlpOutcome::Optimal { objective, .. } => {
            debug!(mu = objective, "least compatible mu found");
            Ok(objective)
        }
        IlpOutcome::NoSolution => Err(PathtimeError::ilp(
            "mu-max model is infeasible despite trivial weighting",
        )),
    }
}

/// Shared model: binary path indicators, free edge weights pinned per
/// basis path, objective = weighted length of the chosen path.
fn solve_weighted_path_model(
    dag: &ControlFlowDag,
    store: &ConstraintStore,
    solver: &dyn IlpSolver,
    basis_paths: &[Vec<Edge>],
    pins: &[(f64, f64)],
    weight_bound: f64,
    query_name: &str,
) -> Result<Option<ExtremePath>> {
    if dag.num_nodes() == 1 {
        return Ok(Some(ExtremePath {
            nodes: vec![dag.source().clone()],
            objective: 0.0,
            problem: IlpProblem::new(query_name, Sense::Maximize),
        }));
    }
    let big_m = 2.0 * weight_bound;
    let m = dag.num_edges();

    let mut problem = IlpProblem::new(query_name, Sense::Maximize);
    let selects: Vec<VarId> = (0..m).map(|i| problem.add_binary(format!("x{i}"))).collect();
    let weights: Vec<VarId> = (0..m)
        .map(|i| {
            problem.add_variable(format!("w{i}"), VarKind::Continuous, -weight_bound, weight_bound)
        })
        .collect();
    let products: Vec<VarId> = (0..m)
        .map(|i| {
            problem.add_variable(format!("z{i}"), VarKind::Continuous, -weight_bound, weight_bound)
        })
        .collect();

    add_flow_constraints(dag, &mut problem, &selects)?;
    add_path_constraints(dag, store, &mut problem, &selects)?;

    // z_i <= w_i * x_i from above; maximization pushes z_i onto the bound.
    for i in 0..m {
        let mut off = LinExpr::term(products[i], 1.0);
        off.add_term(selects[i], -big_m);
        problem.add_constraint(format!("prod_off_{i}"), off, Cmp::Le, 0.0);
        let mut on = LinExpr::term(products[i], 1.0);
        on.add_term(weights[i], -1.0);
        on.add_term(selects[i], big_m);
        problem.add_constraint(format!("prod_on_{i}"), on, Cmp::Le, big_m);
    }

    for (i, (path, (lower, upper))) in basis_paths.iter().zip(pins).enumerate() {
        let mut length = LinExpr::new();
        for edge in path {
            length.add_term(weights[edge_index(dag, edge)?], 1.0);
        }
        problem.add_constraint(format!("pin_lo_{i}"), length.clone(), Cmp::Ge, *lower);
        problem.add_constraint(format!("pin_hi_{i}"), length, Cmp::Le, *upper);
    }

    problem.set_objective(
        LinExpr::sum(products.iter().copied()),
        Sense::Maximize,
    );

    match solver.solve(&problem)? {
        IlpOutcome::NoSolution => Ok(None),
        IlpOutcome::Optimal {
            objective,
            assignment,
        } => {
            let selected: Vec<Edge> = dag
                .all_edges()
                .iter()
                .enumerate()
                .filter(|(i, _)| assignment[selects[*i].0] > 0.5)
                .map(|(_, e)| e.clone())
                .collect();
            let nodes = thread_edges(dag, &selected).ok_or_else(|| {
                PathtimeError::ilp("selected edges do not form a source-to-sink path")
            })?;
            debug!(objective, "expressible path found");
            Ok(Some(ExtremePath {
                nodes,
                objective,
                problem,
            }))
        }
    }
}

fn add_flow_constraints(
    dag: &ControlFlowDag,
    problem: &mut IlpProblem,
    selects: &[VarId],
) -> Result<()> {
    let source_out: Vec<VarId> = dag
        .out_edges(dag.source())
        .iter()
        .map(|e| Ok(selects[edge_index(dag, e)?]))
        .collect::<Result<_>>()?;
    problem.add_constraint("flow_source", LinExpr::sum(source_out), Cmp::Eq, 1.0);
    let sink_in: Vec<VarId> = dag
        .in_edges(dag.sink())
        .iter()
        .map(|e| Ok(selects[edge_index(dag, e)?]))
        .collect::<Result<_>>()?;
    problem.add_constraint("flow_sink", LinExpr::sum(sink_in), Cmp::Eq, 1.0);
    for node in dag.nodes_except_source_sink() {
        let mut balance = LinExpr::new();
        for edge in dag.in_edges(node) {
            balance.add_term(selects[edge_index(dag, &edge)?], 1.0);
        }
        for edge in dag.out_edges(node) {
            balance.add_term(selects[edge_index(dag, &edge)?], -1.0);
        }
        problem.add_constraint(format!("flow_{node}"), balance, Cmp::Eq, 0.0);
    }
    Ok(())
}

/// The persistent exclusive and bundled sets, over raw-edge selectors.
fn add_path_constraints(
    dag: &ControlFlowDag,
    store: &ConstraintStore,
    problem: &mut IlpProblem,
    selects: &[VarId],
) -> Result<()> {
    for (k, edges) in store.exclusive_sets().iter().enumerate() {
        let mut expr = LinExpr::new();
        for edge in edges {
            expr.add_term(selects[edge_index(dag, edge)?], 1.0);
        }
        problem.add_constraint(
            format!("exclusive_{k}"),
            expr,
            Cmp::Le,
            edges.len() as f64 - 1.0,
        );
    }
    for (k, edges) in store.bundled_sets().iter().enumerate() {
        let anchor = selects[edge_index(dag, &edges[0])?];
        let mut expr = LinExpr::new();
        for edge in &edges[1..] {
            expr.add_term(selects[edge_index(dag, edge)?], 1.0);
        }
        expr.add_term(anchor, -(edges.len() as f64 - 1.0));
        problem.add_constraint(format!("bundled_{k}"), expr, Cmp::Eq, 0.0);
    }
    Ok(())
}

fn edge_index(dag: &ControlFlowDag, edge: &Edge) -> Result<usize> {
    dag.edge_index(edge)
        .ok_or_else(|| PathtimeError::ilp(format!("model references unknown edge {edge}")))
}

/// Thread a node path through a set of selected edges.
fn thread_edges(dag: &ControlFlowDag, selected: &[Edge]) -> Option<Vec<NodeId>> {
    let mut remaining: Vec<Edge> = selected.to_vec();
    let mut path = vec![dag.source().clone()];
    let mut current = dag.source().clone();
    while current != *dag.sink() {
        let pos = remaining.iter().position(|e| e.source == current)?;
        let edge = remaining.swap_remove(pos);
        current = edge.target.clone();
        path.push(current.clone());
    }
    if remaining.is_empty() {
        Some(path)
    } else {
        None
    }
}
