//! Analysis context: configuration plus the pluggable backends.

use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::errors::Result;
use crate::features::feasibility::infrastructure::Scratch;
use crate::features::feasibility::ports::{Measurer, SmtOracle};
use crate::features::ilp::infrastructure::solvers::default_solver;
use crate::features::ilp::ports::IlpSolver;

/// Everything an analysis run needs beyond the DAG itself.
pub struct Context {
    pub config: AnalysisConfig,
    pub solver: Arc<dyn IlpSolver>,
    pub oracle: Arc<dyn SmtOracle>,
    pub measurer: Arc<dyn Measurer>,
    pub scratch: Scratch,
}

impl Context {
    /// Context with the in-crate ILP backend and a temp scratch directory.
    pub fn new(
        config: AnalysisConfig,
        oracle: Arc<dyn SmtOracle>,
        measurer: Arc<dyn Measurer>,
    ) -> Result<Self> {
        config.validate()?;
        let scratch = Scratch::in_temp(&config.debug)?;
        Ok(Context {
            config,
            solver: default_solver(),
            oracle,
            measurer,
            scratch,
        })
    }

    pub fn with_solver(mut self, solver: Arc<dyn IlpSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_scratch(mut self, scratch: Scratch) -> Self {
        self.scratch = scratch;
        self
    }
}
