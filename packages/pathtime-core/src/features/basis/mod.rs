//! Basis feature: the path basis matrix, cofactor weighting, the greedy
//! construction and refinement engine, and edge-weight reconstruction.

pub mod application;
pub mod domain;

pub use application::{estimate_edge_weights, BasisEngine, BasisResult, EdgeWeightEstimate};
pub use domain::BasisMatrix;
