//! Feasibility feature: path model, oracle and measurer ports, the
//! check-and-measure service, and in-process scripted backends.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{CheckOutcome, FeasibilityChecker};
pub use domain::{Path, PathStatus, WitnessInputs, INFEASIBLE_MEASUREMENT};
pub use infrastructure::{Scratch, ScriptedMeasurer, ScriptedOracle};
pub use ports::{Measurer, SmtOracle, Verdict};
