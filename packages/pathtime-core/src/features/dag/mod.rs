//! Control-flow DAG feature: domain model plus DOT input and output.

pub mod domain;
pub mod infrastructure;

pub use domain::{CfgNode, ControlFlowDag};
pub use infrastructure::dot::{read_dot_file, read_dot_str, render_dot, write_dot_file};
