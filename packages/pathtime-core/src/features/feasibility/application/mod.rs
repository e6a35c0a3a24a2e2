pub mod checker;

pub use checker::{exclusion_for_core, CheckOutcome, FeasibilityChecker};
