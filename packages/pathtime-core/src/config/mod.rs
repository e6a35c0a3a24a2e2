//! Analysis configuration
//!
//! A single serde-backed config struct with a YAML loader and an explicit
//! validation pass. Defaults follow the reference tool this engine was built
//! against: determinant threshold 0.001, 100 infeasible attempts per row,
//! error scale factor 10, 10 measurement repeats.

use serde::{Deserialize, Serialize};

use crate::errors::{PathtimeError, Result};

/// Options controlling one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Ask the (external) preprocessor to unroll loops before DAG extraction.
    /// Recorded here and surfaced through the preprocessing contract only.
    pub unroll_loops: bool,

    /// Ask the (external) preprocessor to inline callees.
    pub inline_functions: bool,

    /// Fisher-Yates shuffle of the starting identity basis.
    pub randomize_initial_basis: bool,

    /// Minimum `|det(B)|` for a row replacement to be considered good.
    pub determinant_threshold: f64,

    /// Infeasible candidate attempts before a row is declared bad.
    pub max_infeasible_paths: u32,

    /// Skip the 2-barycentric refinement phase.
    pub prevent_basis_refinement: bool,

    /// L1 bound on basis coefficients in overcomplete mode.
    pub maximum_error_scale_factor: f64,

    /// Iteratively extend the basis until the error scale factor holds.
    pub over_complete_basis: bool,

    /// Drive path generation through the measurement-compatible-delta
    /// formulation instead of estimated edge weights.
    pub ob_extraction: bool,

    /// How many times the backend measures each input vector; the maximum
    /// of the repeats is recorded.
    pub measurement_repeats: u32,

    /// Seed for the basis shuffle and the random-path sampler.
    pub random_seed: u64,

    /// Remove back edges when the input graph has cycles instead of
    /// rejecting it. The removal is recorded on the DAG.
    pub remove_back_edges: bool,

    /// Debugging switches.
    pub debug: DebugConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            unroll_loops: false,
            inline_functions: false,
            randomize_initial_basis: false,
            determinant_threshold: 0.001,
            max_infeasible_paths: 100,
            prevent_basis_refinement: false,
            maximum_error_scale_factor: 10.0,
            over_complete_basis: false,
            ob_extraction: false,
            measurement_repeats: 10,
            random_seed: 0,
            remove_back_edges: false,
            debug: DebugConfig::default(),
        }
    }
}

/// Debugging configuration: which intermediate artifacts survive the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugConfig {
    /// Keep the files produced while solving integer linear programs.
    pub keep_ilp_artifacts: bool,

    /// Preserve the per-analysis scratch directory instead of removing it.
    pub keep_scratch_dir: bool,

    /// Append every SMT query sent to the oracle to a log file in the
    /// scratch directory.
    pub dump_all_queries: bool,
}

impl AnalysisConfig {
    /// Load a configuration from a YAML file and validate it.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Parse a configuration from YAML text and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(text)
            .map_err(|e| PathtimeError::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks; fatal at startup per the error model.
    pub fn validate(&self) -> Result<()> {
        if !(self.determinant_threshold > 0.0) {
            return Err(PathtimeError::config(format!(
                "determinant_threshold must be positive, got {}",
                self.determinant_threshold
            )));
        }
        if self.max_infeasible_paths == 0 {
            return Err(PathtimeError::config(
                "max_infeasible_paths must be at least 1",
            ));
        }
        if self.maximum_error_scale_factor < 1.0 {
            return Err(PathtimeError::config(format!(
                "maximum_error_scale_factor must be at least 1, got {}",
                self.maximum_error_scale_factor
            )));
        }
        if self.measurement_repeats == 0 {
            return Err(PathtimeError::config("measurement_repeats must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
randomize_initial_basis: true
determinant_threshold: 0.01
max_infeasible_paths: 5
random_seed: 42
debug:
  keep_scratch_dir: true
"#;
        let config = AnalysisConfig::from_yaml_str(yaml).unwrap();
        assert!(config.randomize_initial_basis);
        assert_eq!(config.determinant_threshold, 0.01);
        assert_eq!(config.max_infeasible_paths, 5);
        assert_eq!(config.random_seed, 42);
        assert!(config.debug.keep_scratch_dir);
        // Unset fields keep their defaults.
        assert_eq!(config.measurement_repeats, 10);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(AnalysisConfig::from_yaml_str("no_such_option: true").is_err());
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let err = AnalysisConfig::from_yaml_str("determinant_threshold: 0.0").unwrap_err();
        assert!(err.to_string().contains("determinant_threshold"));
    }

    #[test]
    fn test_rejects_zero_repeats() {
        assert!(AnalysisConfig::from_yaml_str("measurement_repeats: 0").is_err());
    }
}
