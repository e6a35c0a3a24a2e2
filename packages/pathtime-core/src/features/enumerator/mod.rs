//! Path enumeration feature: ordered, exhaustive, and random generation of
//! feasible paths under the persistent constraints.

pub mod application;
pub mod domain;

pub use application::PathEnumerator;
pub use domain::GenerationMode;
