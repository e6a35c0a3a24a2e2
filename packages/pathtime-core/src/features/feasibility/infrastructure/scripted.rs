//! In-process oracle and measurer.
//!
//! The scripted backends answer from declarative tables instead of an SMT
//! solver or a hardware harness. They serve the test suites and make the
//! analysis runnable end to end without external tooling.

use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashMap;

use crate::errors::{PathtimeError, Result};
use crate::features::dag::domain::ControlFlowDag;
use crate::features::feasibility::domain::WitnessInputs;
use crate::features::feasibility::ports::{Measurer, SmtOracle, Verdict};
use crate::shared::models::{Edge, NodeId};

/// Oracle scripted with pairwise edge conflicts: a path that traverses both
/// edges of a conflict is UNSAT, with the core blaming both branch points.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    conflicts: Vec<(Edge, Edge)>,
    witness: WitnessInputs,
}

impl ScriptedOracle {
    pub fn feasible_everywhere() -> Self {
        ScriptedOracle::default()
    }

    pub fn with_conflict(mut self, a: Edge, b: Edge) -> Self {
        self.conflicts.push((a, b));
        self
    }

    pub fn with_witness(mut self, witness: WitnessInputs) -> Self {
        self.witness = witness;
        self
    }
}

impl SmtOracle for ScriptedOracle {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn check_path(&self, _dag: &ControlFlowDag, nodes: &[NodeId]) -> Result<Verdict> {
        let edges = ControlFlowDag::edges_of(nodes);
        for (a, b) in &self.conflicts {
            let pos_a = edges.iter().position(|e| e == a);
            let pos_b = edges.iter().position(|e| e == b);
            if let (Some(pos_a), Some(pos_b)) = (pos_a, pos_b) {
                let mut core = vec![pos_a, pos_b];
                core.sort_unstable();
                return Ok(Verdict::Unsat { core });
            }
        }
        Ok(Verdict::Sat(self.witness.clone()))
    }
}

/// Measurer scripted with per-edge cycle costs plus an optional repeating
/// jitter sequence, so repeat-and-max has something to chew on.
#[derive(Debug, Default)]
pub struct ScriptedMeasurer {
    edge_costs: FxHashMap<Edge, u64>,
    jitter: Vec<u64>,
    cursor: AtomicUsize,
}

impl ScriptedMeasurer {
    pub fn new() -> Self {
        ScriptedMeasurer::default()
    }

    pub fn with_edge_cost(mut self, edge: Edge, cost: u64) -> Self {
        self.edge_costs.insert(edge, cost);
        self
    }

    pub fn with_costs(mut self, costs: impl IntoIterator<Item = (Edge, u64)>) -> Self {
        self.edge_costs.extend(costs);
        self
    }

    /// Successive measurements cycle through `jitter`, added on top of the
    /// path cost.
    pub fn with_jitter(mut self, jitter: Vec<u64>) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Measurer for ScriptedMeasurer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn measure_once(
        &self,
        dag: &ControlFlowDag,
        nodes: &[NodeId],
        _witness: &WitnessInputs,
    ) -> Result<u64> {
        let mut total = 0u64;
        for edge in ControlFlowDag::edges_of(nodes) {
            if dag.edge_index(&edge).is_none() {
                return Err(PathtimeError::measurement(format!(
                    "cannot measure unknown edge {edge}"
                )));
            }
            total = total.saturating_add(self.edge_costs.get(&edge).copied().unwrap_or(0));
        }
        if !self.jitter.is_empty() {
            let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.jitter.len();
            total = total.saturating_add(self.jitter[i]);
        }
        Ok(total)
    }
}
