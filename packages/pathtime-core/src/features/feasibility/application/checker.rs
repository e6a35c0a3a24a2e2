//! Feasibility checking and measurement of candidate paths.

use tracing::{debug, instrument, warn};

use crate::errors::{PathtimeError, Result};
use crate::features::dag::domain::ControlFlowDag;
use crate::features::feasibility::domain::{Path, PathStatus};
use crate::features::feasibility::ports::{Measurer, SmtOracle, Verdict};
use crate::shared::models::Edge;

/// What the engine learns about a candidate path.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Feasible,
    /// The edge set to exclude from future queries.
    Infeasible { exclusion: Vec<Edge> },
}

/// Runs the oracle and, on SAT, the repeat-and-max measurement protocol.
pub struct FeasibilityChecker<'a> {
    oracle: &'a dyn SmtOracle,
    measurer: &'a dyn Measurer,
    repeats: u32,
}

impl<'a> FeasibilityChecker<'a> {
    pub fn new(oracle: &'a dyn SmtOracle, measurer: &'a dyn Measurer, repeats: u32) -> Self {
        debug_assert!(repeats >= 1);
        FeasibilityChecker {
            oracle,
            measurer,
            repeats,
        }
    }

    /// Oracle verdict only; the path's status and witness are updated but
    /// no measurement is taken.
    #[instrument(skip_all, fields(path = %path.id))]
    pub fn check(&self, dag: &ControlFlowDag, path: &mut Path) -> Result<CheckOutcome> {
        match self.oracle.check_path(dag, &path.nodes)? {
            Verdict::Sat(witness) => {
                path.status = PathStatus::Feasible;
                path.witness = Some(witness);
                Ok(CheckOutcome::Feasible)
            }
            Verdict::Unsat { core } => {
                path.mark_infeasible();
                let exclusion = exclusion_for_core(&path.edges, &core);
                debug!(core = ?core, excluded = exclusion.len(), "path is infeasible");
                Ok(CheckOutcome::Infeasible { exclusion })
            }
        }
    }

    /// Check, then on SAT measure `repeats` times and keep the maximum.
    pub fn check_and_measure(&self, dag: &ControlFlowDag, path: &mut Path) -> Result<CheckOutcome> {
        let outcome = self.check(dag, path)?;
        if outcome == CheckOutcome::Feasible {
            self.measure(dag, path)?;
        }
        Ok(outcome)
    }

    /// Repeat-and-max measurement of an already-SAT path.
    pub fn measure(&self, dag: &ControlFlowDag, path: &mut Path) -> Result<u64> {
        let witness = path.witness.clone().ok_or_else(|| {
            PathtimeError::measurement("path has no witness inputs to replay")
        })?;
        let mut max = 0u64;
        for _ in 0..self.repeats {
            let value = self.measurer.measure_once(dag, &path.nodes, &witness)?;
            max = max.max(value);
        }
        path.measured = Some(max);
        debug!(path = %path.id, measured = max, repeats = self.repeats, "path measured");
        Ok(max)
    }
}

/// Translate an UNSAT core into the edge set to exclude.
///
/// Core position `i` names the branch leaving the path's `i`-th node, so it
/// maps to the path's `i`-th edge. An empty core blames the whole path.
pub fn exclusion_for_core(path_edges: &[Edge], core: &[usize]) -> Vec<Edge> {
    if core.is_empty() {
        return path_edges.to_vec();
    }
    let mut exclusion = Vec::new();
    for &i in core {
        match path_edges.get(i) {
            Some(edge) => exclusion.push(edge.clone()),
            None => warn!(index = i, "unsat core index beyond path length, ignored"),
        }
    }
    if exclusion.is_empty() {
        // Every index was out of range; fall back to the whole path.
        path_edges.to_vec()
    } else {
        exclusion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges() -> Vec<Edge> {
        vec![
            Edge::new("a", "b"),
            Edge::new("b", "c"),
            Edge::new("c", "d"),
        ]
    }

    #[test]
    fn test_core_maps_to_outgoing_edges() {
        let exclusion = exclusion_for_core(&edges(), &[0, 2]);
        assert_eq!(exclusion, vec![Edge::new("a", "b"), Edge::new("c", "d")]);
    }

    #[test]
    fn test_empty_core_blames_whole_path() {
        assert_eq!(exclusion_for_core(&edges(), &[]), edges());
    }

    #[test]
    fn test_out_of_range_core_falls_back_to_whole_path() {
        assert_eq!(exclusion_for_core(&edges(), &[9]), edges());
    }
}
