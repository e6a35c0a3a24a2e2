//! A candidate execution path and everything learned about it.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::features::dag::domain::ControlFlowDag;
use crate::features::ilp::domain::IlpProblem;
use crate::shared::models::{Edge, NodeId, PathId};

/// Sentinel stored as the measured value of a path that turned out to be
/// unexecutable on the target.
pub const INFEASIBLE_MEASUREMENT: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStatus {
    Unknown,
    Feasible,
    Infeasible,
}

/// Input assignment produced by a SAT verdict, replayed by the measurer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WitnessInputs {
    /// Variable name and value, in the oracle's order.
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct Path {
    pub id: PathId,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<Edge>,
    /// 0/1 coordinates over the reduced edges.
    pub compressed: Vec<f64>,
    pub status: PathStatus,
    /// Concrete inputs that drive execution down this path.
    pub witness: Option<WitnessInputs>,
    /// Measured cycle count; `INFEASIBLE_MEASUREMENT` marks unexecutable.
    pub measured: Option<u64>,
    /// Length the reconstructed edge weights predict for this path.
    pub predicted: Option<f64>,
    /// The ILP model that produced this path, kept for debug artifacts.
    pub ilp_problem: Option<IlpProblem>,
}

impl Path {
    /// Build a path from its node sequence, deriving edges and compressed
    /// coordinates from the DAG.
    pub fn from_nodes(dag: &ControlFlowDag, id: PathId, nodes: Vec<NodeId>) -> Result<Self> {
        let edges = ControlFlowDag::edges_of(&nodes);
        for edge in &edges {
            if dag.edge_index(edge).is_none() {
                return Err(crate::errors::PathtimeError::malformed_dag(format!(
                    "path uses edge {edge} that is not in the graph"
                )));
            }
        }
        let compressed = dag.compress_path(&edges);
        Ok(Path {
            id,
            nodes,
            edges,
            compressed,
            status: PathStatus::Unknown,
            witness: None,
            measured: None,
            predicted: None,
            ilp_problem: None,
        })
    }

    pub fn is_feasible(&self) -> bool {
        self.status == PathStatus::Feasible
    }

    /// Measured value as a float; infeasible and unmeasured paths read as 0.
    pub fn measured_value(&self) -> f64 {
        match self.measured {
            Some(INFEASIBLE_MEASUREMENT) | None => 0.0,
            Some(v) => v as f64,
        }
    }

    pub fn mark_infeasible(&mut self) {
        self.status = PathStatus::Infeasible;
        self.measured = Some(INFEASIBLE_MEASUREMENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dag::domain::CfgNode;

    fn diamond() -> ControlFlowDag {
        let node = |id: &str| CfgNode {
            id: id.to_string(),
            label: String::new(),
        };
        ControlFlowDag::from_parts(
            vec![node("a"), node("b"), node("c"), node("d")],
            vec![
                Edge::new("a", "b"),
                Edge::new("a", "c"),
                Edge::new("b", "d"),
                Edge::new("c", "d"),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_from_nodes_derives_edges_and_coordinates() {
        let dag = diamond();
        let path =
            Path::from_nodes(&dag, PathId(0), vec!["a".into(), "b".into(), "d".into()]).unwrap();
        assert_eq!(path.edges, vec![Edge::new("a", "b"), Edge::new("b", "d")]);
        assert_eq!(path.compressed, vec![1.0, 0.0]);
        assert_eq!(path.status, PathStatus::Unknown);
    }

    #[test]
    fn test_from_nodes_rejects_phantom_edge() {
        let dag = diamond();
        assert!(Path::from_nodes(&dag, PathId(0), vec!["a".into(), "d".into()]).is_err());
    }

    #[test]
    fn test_infeasible_sentinel_reads_as_zero() {
        let dag = diamond();
        let mut path =
            Path::from_nodes(&dag, PathId(1), vec!["a".into(), "c".into(), "d".into()]).unwrap();
        path.mark_infeasible();
        assert_eq!(path.measured, Some(INFEASIBLE_MEASUREMENT));
        assert_eq!(path.measured_value(), 0.0);
        assert!(!path.is_feasible());
    }
}
