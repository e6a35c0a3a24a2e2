pub mod compact;
pub mod expressible;
pub mod extreme_path;
pub mod solvers;
