pub mod scratch;
pub mod scripted;

pub use scratch::Scratch;
pub use scripted::{ScriptedMeasurer, ScriptedOracle};
