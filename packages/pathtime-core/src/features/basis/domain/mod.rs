pub mod matrix;
pub mod weights;

pub use matrix::BasisMatrix;
