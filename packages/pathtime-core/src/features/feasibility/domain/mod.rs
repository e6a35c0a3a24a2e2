pub mod path;

pub use path::{Path, PathStatus, WitnessInputs, INFEASIBLE_MEASUREMENT};
