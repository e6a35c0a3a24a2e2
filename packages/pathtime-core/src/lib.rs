//! Measurement-based worst-case execution time estimation.
//!
//! Given the control-flow DAG of a procedure, the crate builds a feasible
//! *basis* of program paths whose 0/1 coordinate vectors span the path
//! space, drives the program down each basis path to measure it, solves
//! for per-edge timings, and then asks an ILP for the longest feasible
//! path under those timings.
//!
//! The pieces are organized as feature slices:
//!
//! - [`features::dag`]: the single-source, single-sink DAG, its
//!   reduced-edge coordinate system, and DOT I/O.
//! - [`features::basis`]: the basis matrix, cofactor weighting, the greedy
//!   construction/refinement engine, and edge-weight reconstruction.
//! - [`features::ilp`]: path-query models, persistent path constraints,
//!   and solver backends (an in-crate branch-and-bound by default, CBC
//!   behind the `cbc` feature).
//! - [`features::feasibility`]: the SMT-oracle and measurement ports with
//!   scripted in-process implementations.
//! - [`features::enumerator`]: ordered, exhaustive, and random feasible
//!   path generation.
//! - [`pipeline`]: the end-to-end analysis run.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pathtime_core::config::AnalysisConfig;
//! use pathtime_core::features::dag::read_dot_str;
//! use pathtime_core::features::feasibility::{ScriptedMeasurer, ScriptedOracle};
//! use pathtime_core::pipeline::{Analysis, Context};
//!
//! # fn main() -> pathtime_core::errors::Result<()> {
//! use pathtime_core::shared::models::Edge;
//!
//! let dag = read_dot_str("digraph g { a -> b; }", false)?;
//! let measurer = ScriptedMeasurer::new().with_edge_cost(Edge::new("a", "b"), 7);
//! let ctx = Context::new(
//!     AnalysisConfig::default(),
//!     Arc::new(ScriptedOracle::feasible_everywhere()),
//!     Arc::new(measurer),
//! )?;
//! let report = Analysis::new(&ctx, dag).run()?;
//! println!("wcet estimate: {}", report.estimate);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod features;
pub mod pipeline;
pub mod shared;

pub use config::AnalysisConfig;
pub use errors::{PathtimeError, Result};
pub use features::basis::{BasisEngine, BasisMatrix, BasisResult};
pub use features::dag::ControlFlowDag;
pub use features::enumerator::GenerationMode;
pub use features::feasibility::{Measurer, Path, PathStatus, SmtOracle, Verdict};
pub use features::ilp::{ConstraintStore, IlpSolver};
pub use pipeline::{Analysis, Context, WcetReport};
pub use shared::models::{Edge, Interval, NodeId, PathId};
