pub mod dag;

pub use dag::{CfgNode, ControlFlowDag};
