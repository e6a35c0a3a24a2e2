//! Path-generation modes.

use serde::{Deserialize, Serialize};

/// How the enumerator walks the path population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// The N longest feasible paths, longest first.
    WorstCase,
    /// The N shortest feasible paths, shortest first.
    BestCase,
    /// Every feasible path, in decreasing length order.
    AllDecreasing,
    /// Every feasible path, in increasing length order.
    AllIncreasing,
    /// N distinct feasible paths sampled by random walks.
    Random,
}
