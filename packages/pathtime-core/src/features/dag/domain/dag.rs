//! Control-flow DAG with the reduced-edge coordinate system
//!
//! The DAG is single-source, single-sink and immutable after construction,
//! except for the `edge_weights` vector the ILP layer reads. Every
//! non-source, non-sink node elects one outgoing "special" (default) edge;
//! the remaining `b = m - n + 2` edges form the canonical coordinates of a
//! compressed path vector.
//!
//! Orderings are deterministic: nodes sort lexicographically by id, edges
//! sort by (source position, target position). The special edge of a node is
//! the first outgoing edge under that ordering. This tie-break fixes the
//! meaning of every basis-matrix column and must not change.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{PathtimeError, Result};
use crate::shared::models::{Edge, NodeId};

/// Basic block: an opaque id plus the IR text handed to the SMT oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgNode {
    pub id: NodeId,
    pub label: String,
}

/// Single-source, single-sink control-flow DAG.
#[derive(Debug, Clone)]
pub struct ControlFlowDag {
    graph: DiGraph<CfgNode, ()>,
    node_map: FxHashMap<NodeId, NodeIndex>,

    source: NodeId,
    sink: NodeId,

    /// Nodes sorted by id; position is the canonical node index.
    all_nodes: Vec<NodeId>,
    /// All nodes except the source and the sink, in canonical order.
    nodes_except_source_sink: Vec<NodeId>,

    /// Edges in canonical order; position is the canonical edge index.
    all_edges: Vec<Edge>,
    edge_indices: FxHashMap<Edge, usize>,

    /// Non-special edges in canonical order: the path coordinate system.
    edges_reduced: Vec<Edge>,
    /// For reduced edge `j`, its index into `all_edges`.
    edges_reduced_indices: Vec<usize>,
    /// Special ("default") edge elected by each internal node.
    special_edges: FxHashMap<NodeId, Edge>,

    /// Mutable weights, parallel to `all_edges`. Reset between phases.
    pub edge_weights: Vec<f64>,

    /// Total number of source-to-sink paths (saturating).
    num_paths: u64,

    /// Whether a back-edge-removal pass ran during construction.
    back_edges_removed: bool,
}

impl ControlFlowDag {
    /// Build a DAG from labeled nodes and directed edges.
    ///
    /// When `remove_back_edges` is set, self-loops and DFS back edges are
    /// dropped (and the fact recorded); otherwise any cycle is rejected.
    pub fn from_parts(
        nodes: Vec<CfgNode>,
        edges: Vec<Edge>,
        remove_back_edges: bool,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(PathtimeError::malformed_dag("graph has no nodes"));
        }

        let mut graph: DiGraph<CfgNode, ()> = DiGraph::new();
        let mut node_map: FxHashMap<NodeId, NodeIndex> = FxHashMap::default();
        for node in nodes {
            if node_map.contains_key(&node.id) {
                return Err(PathtimeError::malformed_dag(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
            let id = node.id.clone();
            let idx = graph.add_node(node);
            node_map.insert(id, idx);
        }

        let mut seen_edges: FxHashSet<Edge> = FxHashSet::default();
        let mut kept_edges: Vec<Edge> = Vec::new();
        for edge in edges {
            if edge.source == edge.target {
                if remove_back_edges {
                    warn!(edge = %edge, "dropping self-loop");
                    continue;
                }
                return Err(PathtimeError::malformed_dag(format!(
                    "self-loop on node {}",
                    edge.source
                )));
            }
            let from = *node_map.get(&edge.source).ok_or_else(|| {
                PathtimeError::malformed_dag(format!("edge from unknown node {}", edge.source))
            })?;
            let to = *node_map.get(&edge.target).ok_or_else(|| {
                PathtimeError::malformed_dag(format!("edge to unknown node {}", edge.target))
            })?;
            if seen_edges.insert(edge.clone()) {
                graph.add_edge(from, to, ());
                kept_edges.push(edge);
            }
        }

        let mut back_edges_removed = false;
        if petgraph::algo::is_cyclic_directed(&graph) {
            if !remove_back_edges {
                return Err(PathtimeError::malformed_dag(
                    "control-flow graph has cycles; enable back-edge removal or unroll loops first",
                ));
            }
            let removed = Self::strip_back_edges(&mut graph, &node_map, &mut kept_edges)?;
            warn!(removed, "removed back edges from cyclic control-flow graph");
            back_edges_removed = true;
            if petgraph::algo::is_cyclic_directed(&graph) {
                return Err(PathtimeError::malformed_dag(
                    "cycles remain after back-edge removal",
                ));
            }
        }

        Self::finish(graph, node_map, kept_edges, back_edges_removed)
    }

    /// DFS back-edge removal starting from the unique zero-in-degree node.
    fn strip_back_edges(
        graph: &mut DiGraph<CfgNode, ()>,
        node_map: &FxHashMap<NodeId, NodeIndex>,
        kept_edges: &mut Vec<Edge>,
    ) -> Result<usize> {
        let roots: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&n| graph.neighbors_directed(n, Direction::Incoming).count() == 0)
            .collect();
        if roots.len() != 1 {
            return Err(PathtimeError::malformed_dag(format!(
                "expected exactly one entry node for back-edge removal, found {}",
                roots.len()
            )));
        }

        // Iterative DFS with a gray set; an edge into a gray node is a back
        // edge.
        let mut color: FxHashMap<NodeIndex, u8> = FxHashMap::default(); // 1 gray, 2 black
        let mut back: Vec<(NodeIndex, NodeIndex)> = Vec::new();
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = Vec::new();

        let successors = |g: &DiGraph<CfgNode, ()>, n: NodeIndex| -> Vec<NodeIndex> {
            let mut out: Vec<NodeIndex> = g.neighbors_directed(n, Direction::Outgoing).collect();
            out.sort();
            out
        };

        color.insert(roots[0], 1);
        let succ = successors(graph, roots[0]);
        stack.push((roots[0], succ));
        while let Some((node, mut rest)) = stack.pop() {
            match rest.pop() {
                None => {
                    color.insert(node, 2);
                }
                Some(next) => {
                    stack.push((node, rest));
                    match color.get(&next).copied().unwrap_or(0) {
                        1 => back.push((node, next)),
                        0 => {
                            color.insert(next, 1);
                            let succ = successors(graph, next);
                            stack.push((next, succ));
                        }
                        _ => {}
                    }
                }
            }
        }

        let removed = back.len();
        for (from, to) in back {
            if let Some(edge_idx) = graph.find_edge(from, to) {
                graph.remove_edge(edge_idx);
            }
            let from_id = &graph[from].id;
            let to_id = &graph[to].id;
            kept_edges.retain(|e| !(e.source == *from_id && e.target == *to_id));
            let _ = node_map; // ids resolved through the graph itself
        }
        Ok(removed)
    }

    fn finish(
        graph: DiGraph<CfgNode, ()>,
        node_map: FxHashMap<NodeId, NodeIndex>,
        edges: Vec<Edge>,
        back_edges_removed: bool,
    ) -> Result<Self> {
        let mut all_nodes: Vec<NodeId> = node_map.keys().cloned().collect();
        all_nodes.sort();
        let node_pos: FxHashMap<&NodeId, usize> = all_nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();

        // Canonical edge ordering: by (source position, target position).
        let mut all_edges = edges;
        all_edges.sort_by_key(|e| (node_pos[&e.source], node_pos[&e.target]));
        let edge_indices: FxHashMap<Edge, usize> = all_edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i))
            .collect();

        // Unique source and sink.
        let sources: Vec<&NodeId> = all_nodes
            .iter()
            .filter(|id| {
                graph
                    .neighbors_directed(node_map[*id], Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect();
        let sinks: Vec<&NodeId> = all_nodes
            .iter()
            .filter(|id| {
                graph
                    .neighbors_directed(node_map[*id], Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .collect();
        if sources.len() != 1 {
            return Err(PathtimeError::malformed_dag(format!(
                "expected exactly one source, found {}",
                sources.len()
            )));
        }
        if sinks.len() != 1 {
            return Err(PathtimeError::malformed_dag(format!(
                "expected exactly one sink, found {}",
                sinks.len()
            )));
        }
        let source = sources[0].clone();
        let sink = sinks[0].clone();

        let nodes_except_source_sink: Vec<NodeId> = all_nodes
            .iter()
            .filter(|id| **id != source && **id != sink)
            .cloned()
            .collect();

        // Special-edge election: first outgoing edge per internal node.
        let mut special_edges: FxHashMap<NodeId, Edge> = FxHashMap::default();
        let mut is_special: FxHashSet<usize> = FxHashSet::default();
        for node in &nodes_except_source_sink {
            let first_out = all_edges
                .iter()
                .enumerate()
                .find(|(_, e)| e.source == *node);
            if let Some((idx, edge)) = first_out {
                special_edges.insert(node.clone(), edge.clone());
                is_special.insert(idx);
            }
        }

        let mut edges_reduced: Vec<Edge> = Vec::new();
        let mut edges_reduced_indices: Vec<usize> = Vec::new();
        for (idx, edge) in all_edges.iter().enumerate() {
            if !is_special.contains(&idx) {
                edges_reduced.push(edge.clone());
                edges_reduced_indices.push(idx);
            }
        }

        let n = all_nodes.len();
        let m = all_edges.len();
        // Single-node graph: b = 1 by convention, no coordinates needed.
        if n > 1 {
            let b = m + 2 - n;
            if edges_reduced.len() != b {
                return Err(PathtimeError::malformed_dag(format!(
                    "number of non-special edges ({}) differs from the path dimension ({})",
                    edges_reduced.len(),
                    b
                )));
            }
        }

        let mut dag = ControlFlowDag {
            graph,
            node_map,
            source,
            sink,
            all_nodes,
            nodes_except_source_sink,
            all_edges,
            edge_indices,
            edges_reduced,
            edges_reduced_indices,
            special_edges,
            edge_weights: Vec::new(),
            num_paths: 0,
            back_edges_removed,
        };
        dag.reset_edge_weights();
        dag.num_paths = dag.count_paths()?;
        debug!(
            nodes = dag.num_nodes(),
            edges = dag.num_edges(),
            paths = dag.num_paths,
            dimension = dag.path_dimension(),
            "control-flow DAG constructed"
        );
        Ok(dag)
    }

    /// Number of source-to-sink paths, by DP over a topological order.
    fn count_paths(&self) -> Result<u64> {
        if self.num_nodes() == 1 {
            return Ok(1);
        }
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|_| PathtimeError::malformed_dag("graph is not acyclic"))?;
        let mut counts: FxHashMap<NodeIndex, u64> = FxHashMap::default();
        counts.insert(self.node_map[&self.source], 1);
        for node in order {
            let into: u64 = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|p| counts.get(&p).copied().unwrap_or(0))
                .fold(0u64, u64::saturating_add);
            let entry = counts.entry(node).or_insert(0);
            *entry = entry.saturating_add(into);
        }
        Ok(counts
            .get(&self.node_map[&self.sink])
            .copied()
            .unwrap_or(0))
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn sink(&self) -> &NodeId {
        &self.sink
    }

    pub fn num_nodes(&self) -> usize {
        self.all_nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.all_edges.len()
    }

    pub fn num_paths(&self) -> u64 {
        self.num_paths
    }

    pub fn back_edges_removed(&self) -> bool {
        self.back_edges_removed
    }

    /// Path dimension `b = m - n + 2` (1 for a single-node graph).
    pub fn path_dimension(&self) -> usize {
        if self.num_nodes() == 1 {
            1
        } else {
            self.num_edges() + 2 - self.num_nodes()
        }
    }

    pub fn all_nodes(&self) -> &[NodeId] {
        &self.all_nodes
    }

    pub fn nodes_except_source_sink(&self) -> &[NodeId] {
        &self.nodes_except_source_sink
    }

    pub fn all_edges(&self) -> &[Edge] {
        &self.all_edges
    }

    pub fn edges_reduced(&self) -> &[Edge] {
        &self.edges_reduced
    }

    /// Canonical index of a reduced edge into `all_edges`.
    pub fn reduced_edge_index(&self, j: usize) -> usize {
        self.edges_reduced_indices[j]
    }

    pub fn special_edge(&self, node: &NodeId) -> Option<&Edge> {
        self.special_edges.get(node)
    }

    pub fn edge_index(&self, edge: &Edge) -> Option<usize> {
        self.edge_indices.get(edge).copied()
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.node_map.contains_key(node)
    }

    /// IR text attached to a node.
    pub fn label(&self, node: &NodeId) -> Option<&str> {
        self.node_map
            .get(node)
            .map(|&idx| self.graph[idx].label.as_str())
    }

    /// Edges into `node`, in canonical order.
    pub fn in_edges(&self, node: &NodeId) -> Vec<Edge> {
        self.all_edges
            .iter()
            .filter(|e| e.target == *node)
            .cloned()
            .collect()
    }

    /// Edges out of `node`, in canonical order.
    pub fn out_edges(&self, node: &NodeId) -> Vec<Edge> {
        self.all_edges
            .iter()
            .filter(|e| e.source == *node)
            .cloned()
            .collect()
    }

    /// Successor node ids in canonical order.
    pub fn successors(&self, node: &NodeId) -> Vec<NodeId> {
        self.out_edges(node).into_iter().map(|e| e.target).collect()
    }

    /// The ordered edges along a node path.
    pub fn edges_of(path_nodes: &[NodeId]) -> Vec<Edge> {
        path_nodes
            .windows(2)
            .map(|w| Edge::new(w[0].clone(), w[1].clone()))
            .collect()
    }

    /// Compress a path (given as its edge set) onto the reduced-edge
    /// coordinates: 1.0 where a non-special edge lies on the path.
    pub fn compress_path(&self, path_edges: &[Edge]) -> Vec<f64> {
        if self.num_nodes() == 1 {
            // Trivial graph: the lone path occupies the single coordinate.
            return vec![1.0];
        }
        let on_path: FxHashSet<&Edge> = path_edges.iter().collect();
        self.edges_reduced
            .iter()
            .map(|e| if on_path.contains(e) { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn reset_edge_weights(&mut self) {
        self.edge_weights = vec![0.0; self.num_edges()];
    }

    /// Uniform random source-to-sink walk. A dead end (possible only on
    /// malformed inputs) restarts the walk, as the reference tool does.
    pub fn random_path<R: Rng>(&self, rng: &mut R) -> Vec<NodeId> {
        if self.num_nodes() == 1 {
            return vec![self.source.clone()];
        }
        let mut path = vec![self.source.clone()];
        let mut current = self.source.clone();
        while current != self.sink {
            let next_nodes = self.successors(&current);
            match next_nodes.len() {
                0 => {
                    path = vec![self.source.clone()];
                    current = self.source.clone();
                }
                1 => {
                    current = next_nodes[0].clone();
                    path.push(current.clone());
                }
                n => {
                    current = next_nodes[rng.gen_range(0..n)].clone();
                    path.push(current.clone());
                }
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> CfgNode {
        CfgNode {
            id: id.to_string(),
            label: format!("ir:{id}"),
        }
    }

    fn diamond() -> ControlFlowDag {
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
    fn test_diamond_dimensions() {
        let dag = diamond();
        assert_eq!(dag.num_nodes(), 4);
        assert_eq!(dag.num_edges(), 4);
        assert_eq!(dag.path_dimension(), 2);
        assert_eq!(dag.num_paths(), 2);
        assert_eq!(dag.source(), "a");
        assert_eq!(dag.sink(), "d");
    }

    #[test]
    fn test_special_edge_election_is_stable() {
        let dag = diamond();
        // Internal nodes b and c each elect their only outgoing edge.
        assert_eq!(dag.special_edge(&"b".to_string()), Some(&Edge::new("b", "d")));
        assert_eq!(dag.special_edge(&"c".to_string()), Some(&Edge::new("c", "d")));
        // Remaining coordinates are the two source edges, in canonical order.
        assert_eq!(
            dag.edges_reduced(),
            &[Edge::new("a", "b"), Edge::new("a", "c")]
        );
    }

    #[test]
    fn test_special_and_reduced_partition_all_edges() {
        let dag = diamond();
        let mut combined: Vec<Edge> = dag.edges_reduced().to_vec();
        for node in dag.nodes_except_source_sink() {
            combined.push(dag.special_edge(node).unwrap().clone());
        }
        combined.sort();
        let mut all = dag.all_edges().to_vec();
        all.sort();
        assert_eq!(combined, all);
    }

    #[test]
    fn test_compress_round_trip() {
        let dag = diamond();
        let nodes: Vec<NodeId> = vec!["a".into(), "c".into(), "d".into()];
        let edges = ControlFlowDag::edges_of(&nodes);
        let compressed = dag.compress_path(&edges);
        assert_eq!(compressed, vec![0.0, 1.0]);
    }

    #[test]
    fn test_rejects_two_sources() {
        let err = ControlFlowDag::from_parts(
            vec![node("a"), node("b"), node("c")],
            vec![Edge::new("a", "c"), Edge::new("b", "c")],
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn test_rejects_cycle_without_removal() {
        let err = ControlFlowDag::from_parts(
            vec![node("a"), node("b"), node("c")],
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "a"),
                Edge::new("b", "c"),
            ],
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_back_edge_removal_records_fact() {
        let dag = ControlFlowDag::from_parts(
            vec![node("a"), node("b"), node("c")],
            vec![
                Edge::new("a", "b"),
                Edge::new("b", "a"),
                Edge::new("b", "c"),
            ],
            true,
        )
        .unwrap();
        assert!(dag.back_edges_removed());
        assert_eq!(dag.num_edges(), 2);
        assert_eq!(dag.num_paths(), 1);
    }

    #[test]
    fn test_single_node_graph() {
        let dag = ControlFlowDag::from_parts(vec![node("only")], vec![], false).unwrap();
        assert_eq!(dag.path_dimension(), 1);
        assert_eq!(dag.num_paths(), 1);
        assert_eq!(dag.source(), dag.sink());
        assert_eq!(dag.compress_path(&[]), vec![1.0]);
    }

    #[test]
    fn test_chain_has_dimension_one() {
        let dag = ControlFlowDag::from_parts(
            vec![node("s"), node("x"), node("y"), node("t")],
            vec![
                Edge::new("s", "x"),
                Edge::new("x", "y"),
                Edge::new("y", "t"),
            ],
            false,
        )
        .unwrap();
        assert_eq!(dag.path_dimension(), 1);
        assert_eq!(dag.edges_reduced(), &[Edge::new("s", "x")]);
    }

    #[test]
    fn test_random_path_is_a_walk() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        let dag = diamond();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let path = dag.random_path(&mut rng);
            assert_eq!(&path[0], dag.source());
            assert_eq!(path.last().unwrap(), dag.sink());
            for pair in path.windows(2) {
                assert!(dag
                    .edge_index(&Edge::new(pair[0].clone(), pair[1].clone()))
                    .is_some());
            }
        }
    }
}
