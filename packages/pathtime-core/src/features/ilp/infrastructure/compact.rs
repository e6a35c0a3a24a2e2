//! Chain compaction for path queries.
//!
//! Long straight-line runs in a CFG add variables to every ILP without
//! adding any choice. Compaction collapses each maximal chain through
//! in-degree-1/out-degree-1 nodes into one segment whose weight is the sum
//! of its edge weights. Linear edge constraints transfer to segments by
//! summing coefficients, because a segment is traversed all-or-nothing.

use rustc_hash::FxHashMap;

use crate::errors::{PathtimeError, Result};
use crate::features::dag::domain::ControlFlowDag;
use crate::shared::models::{Edge, NodeId};

/// A maximal chain between two junction nodes.
#[derive(Debug, Clone)]
pub struct Segment {
    pub source: NodeId,
    pub target: NodeId,
    /// Original edges in traversal order.
    pub edges: Vec<Edge>,
    /// Sum of the original edge weights.
    pub weight: f64,
}

/// Compacted view of a DAG: junction nodes connected by segments.
#[derive(Debug, Clone)]
pub struct CompactDag {
    pub source: NodeId,
    pub sink: NodeId,
    /// Junction nodes, in canonical order.
    pub junctions: Vec<NodeId>,
    pub segments: Vec<Segment>,
    edge_to_segment: FxHashMap<Edge, usize>,
}

impl CompactDag {
    pub fn from_dag(dag: &ControlFlowDag) -> Result<Self> {
        let is_junction = |node: &NodeId| -> bool {
            node == dag.source()
                || node == dag.sink()
                || dag.in_edges(node).len() != 1
                || dag.out_edges(node).len() != 1
        };

        let junctions: Vec<NodeId> = dag
            .all_nodes()
            .iter()
            .filter(|n| is_junction(n))
            .cloned()
            .collect();

        let mut segments = Vec::new();
        let mut edge_to_segment = FxHashMap::default();
        for junction in &junctions {
            for first in dag.out_edges(junction) {
                // Follow the chain until the next junction.
                let mut edges = vec![first.clone()];
                let mut current = first.target.clone();
                while !is_junction(&current) {
                    let next = dag.out_edges(&current).remove(0);
                    current = next.target.clone();
                    edges.push(next);
                }
                let mut weight = 0.0;
                for e in &edges {
                    let idx = dag.edge_index(e).ok_or_else(|| {
                        PathtimeError::ilp(format!("edge {e} has no weight index during compaction"))
                    })?;
                    weight += dag.edge_weights[idx];
                }
                let idx = segments.len();
                for edge in &edges {
                    edge_to_segment.insert(edge.clone(), idx);
                }
                segments.push(Segment {
                    source: junction.clone(),
                    target: current,
                    edges,
                    weight,
                });
            }
        }

        Ok(CompactDag {
            source: dag.source().clone(),
            sink: dag.sink().clone(),
            junctions,
            segments,
            edge_to_segment,
        })
    }

    /// Segment carrying an original edge.
    pub fn segment_of(&self, edge: &Edge) -> Option<usize> {
        self.edge_to_segment.get(edge).copied()
    }

    /// Segments leaving a junction, by index.
    pub fn segments_out(&self, junction: &NodeId) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.source == *junction)
            .map(|(i, _)| i)
            .collect()
    }

    /// Segments entering a junction, by index.
    pub fn segments_in(&self, junction: &NodeId) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.target == *junction)
            .map(|(i, _)| i)
            .collect()
    }

    /// Expand a set of selected segments into the node path they form,
    /// threading from the source. Returns `None` if the selection does not
    /// form a single source-to-sink path.
    pub fn thread_path(&self, selected: &[usize]) -> Option<Vec<NodeId>> {
        let mut path = vec![self.source.clone()];
        let mut current = self.source.clone();
        let mut remaining: Vec<usize> = selected.to_vec();
        while current != self.sink {
            let pos = remaining
                .iter()
                .position(|&i| self.segments[i].source == current)?;
            let seg_idx = remaining.swap_remove(pos);
            let segment = &self.segments[seg_idx];
            for edge in &segment.edges {
                path.push(edge.target.clone());
            }
            current = segment.target.clone();
        }
        if remaining.is_empty() {
            Some(path)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dag::domain::CfgNode;

    fn node(id: &str) -> CfgNode {
        CfgNode {
            id: id.to_string(),
            label: String::new(),
        }
    }

    /// Diamond whose upper arm is a two-edge chain: a -> b -> c -> e,
    /// a -> d -> e.
    fn chained_diamond() -> ControlFlowDag {
        ControlFlowDag::from_parts(
            vec![node("a"), node("b"), node("c"), node("d"), node("e")],
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "c"),
                Edge::new("c", "e"),
                Edge::new("a", "d"),
                Edge::new("d", "e"),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_chain_collapses_to_one_segment() {
        let mut dag = chained_diamond();
        for w in dag.edge_weights.iter_mut() {
            *w = 1.0;
        }
        let compact = CompactDag::from_dag(&dag).unwrap();
        // Junctions: a and e only.
        assert_eq!(compact.junctions, vec!["a".to_string(), "e".to_string()]);
        assert_eq!(compact.segments.len(), 2);
        let long_arm = compact
            .segment_of(&Edge::new("b", "c"))
            .map(|i| &compact.segments[i])
            .unwrap();
        assert_eq!(long_arm.edges.len(), 3);
        assert_eq!(long_arm.weight, 3.0);
    }

    #[test]
    fn test_edges_in_same_segment_share_index() {
        let dag = chained_diamond();
        let compact = CompactDag::from_dag(&dag).unwrap();
        assert_eq!(
            compact.segment_of(&Edge::new("a", "b")),
            compact.segment_of(&Edge::new("c", "e"))
        );
        assert_ne!(
            compact.segment_of(&Edge::new("a", "b")),
            compact.segment_of(&Edge::new("a", "d"))
        );
    }

    #[test]
    fn test_thread_path_expands_interior_nodes() {
        let dag = chained_diamond();
        let compact = CompactDag::from_dag(&dag).unwrap();
        let long_arm = compact.segment_of(&Edge::new("a", "b")).unwrap();
        let path = compact.thread_path(&[long_arm]).unwrap();
        assert_eq!(path, vec!["a", "b", "c", "e"]);
    }

    #[test]
    fn test_thread_path_rejects_disconnected_selection() {
        let dag = chained_diamond();
        let compact = CompactDag::from_dag(&dag).unwrap();
        assert!(compact.thread_path(&[]).is_none());
    }
}
