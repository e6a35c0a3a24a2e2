//! Orchestration of a full analysis run.

pub mod analysis;
pub mod context;

pub use analysis::{Analysis, WcetReport};
pub use context::Context;
