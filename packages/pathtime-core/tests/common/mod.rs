//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use pathtime_core::config::AnalysisConfig;
use pathtime_core::features::dag::domain::CfgNode;
use pathtime_core::features::feasibility::{ScriptedMeasurer, ScriptedOracle};
use pathtime_core::pipeline::Context;
use pathtime_core::{ControlFlowDag, Edge};

pub fn node(id: &str) -> CfgNode {
    CfgNode {
        id: id.to_string(),
        label: format!("block {id}"),
    }
}

/// a -> {b, c} -> d
pub fn diamond() -> ControlFlowDag {
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

/// s -> x -> y -> t, a single path.
pub fn chain() -> ControlFlowDag {
    ControlFlowDag::from_parts(
        vec![node("s"), node("x"), node("y"), node("t")],
        vec![
            Edge::new("s", "x"),
            Edge::new("x", "y"),
            Edge::new("y", "t"),
        ],
        false,
    )
    .unwrap()
}

/// Two diamonds in sequence: four paths, dimension three.
pub fn two_diamond() -> ControlFlowDag {
    ControlFlowDag::from_parts(
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
    .unwrap()
}

/// Edge costs that make the two-diamond's four path lengths distinct:
/// 15, 12, 6, 3.
pub fn two_diamond_costs() -> Vec<(Edge, u64)> {
    vec![
        (Edge::new("a", "b"), 10),
        (Edge::new("a", "c"), 1),
        (Edge::new("d", "e"), 5),
        (Edge::new("d", "f"), 2),
    ]
}

/// Context with scripted backends and an otherwise default configuration.
pub fn scripted_context(
    config: AnalysisConfig,
    oracle: ScriptedOracle,
    measurer: ScriptedMeasurer,
) -> Context {
    Context::new(config, Arc::new(oracle), Arc::new(measurer)).unwrap()
}
