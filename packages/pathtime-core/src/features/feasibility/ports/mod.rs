//! Ports to the SMT oracle and the measurement backend.

use crate::errors::Result;
use crate::features::dag::domain::ControlFlowDag;
use crate::features::feasibility::domain::WitnessInputs;
use crate::shared::models::NodeId;

/// Answer from the feasibility oracle.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The path is executable; the witness drives execution down it.
    Sat(WitnessInputs),
    /// No input takes this path. The core lists positions into the path's
    /// node sequence whose outgoing branch condition participates in the
    /// contradiction; an empty core blames the whole path.
    Unsat { core: Vec<usize> },
}

/// Decides whether a node sequence is an executable program path.
pub trait SmtOracle: Send + Sync {
    fn name(&self) -> &'static str;

    fn check_path(&self, dag: &ControlFlowDag, nodes: &[NodeId]) -> Result<Verdict>;
}

/// Runs the program once under a witness and reports a cycle count.
pub trait Measurer: Send + Sync {
    fn name(&self) -> &'static str;

    fn measure_once(
        &self,
        dag: &ControlFlowDag,
        nodes: &[NodeId],
        witness: &WitnessInputs,
    ) -> Result<u64>;
}
