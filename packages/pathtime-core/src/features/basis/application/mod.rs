pub mod engine;
pub mod estimator;

pub use engine::{BasisEngine, BasisResult};
pub use estimator::{estimate_edge_weights, EdgeWeightEstimate};
