//! Scratch directory for analysis artifacts.
//!
//! ILP models and annotated DOT snapshots land here when the debug
//! options ask for them. Backed by a tempdir that disappears with the
//! analysis unless the configuration pins a concrete directory.

use std::path::{Path as FsPath, PathBuf};

use tracing::{debug, info};

use crate::config::DebugConfig;
use crate::errors::Result;
use crate::features::basis::domain::BasisMatrix;
use crate::features::dag::domain::ControlFlowDag;
use crate::features::dag::infrastructure::dot;
use crate::features::ilp::domain::IlpProblem;
use crate::shared::models::Edge;

pub struct Scratch {
    root: PathBuf,
    // Held for its Drop; removal happens when the scratch goes away.
    _temp: Option<tempfile::TempDir>,
    keep_ilp_artifacts: bool,
    dump_all_queries: bool,
}

impl Scratch {
    /// Scratch in the system temp directory; removed on drop unless
    /// `keep_scratch_dir` is set.
    pub fn in_temp(debug_config: &DebugConfig) -> Result<Self> {
        let temp = tempfile::Builder::new().prefix("pathtime-").tempdir()?;
        let (root, temp) = if debug_config.keep_scratch_dir {
            let root = temp.into_path();
            info!(dir = %root.display(), "scratch directory kept past the run");
            (root, None)
        } else {
            (temp.path().to_path_buf(), Some(temp))
        };
        Ok(Scratch {
            root,
            _temp: temp,
            keep_ilp_artifacts: debug_config.keep_ilp_artifacts,
            dump_all_queries: debug_config.dump_all_queries,
        })
    }

    /// Scratch pinned to a directory that outlives the analysis.
    pub fn at(dir: impl Into<PathBuf>, debug_config: &DebugConfig) -> Result<Self> {
        let root = dir.into();
        std::fs::create_dir_all(&root)?;
        Ok(Scratch {
            root,
            _temp: None,
            keep_ilp_artifacts: debug_config.keep_ilp_artifacts,
            dump_all_queries: debug_config.dump_all_queries,
        })
    }

    pub fn root(&self) -> &FsPath {
        &self.root
    }

    /// Save an ILP model in LP format, if artifact keeping is on.
    pub fn save_problem(&self, name: &str, problem: &IlpProblem) -> Result<()> {
        if !self.keep_ilp_artifacts {
            return Ok(());
        }
        let file = self.root.join(format!("{name}.lp"));
        std::fs::write(&file, problem.render_lp())?;
        debug!(file = %file.display(), "saved ILP artifact");
        Ok(())
    }

    /// Save a solved query in LP format, if query dumping is on.
    pub fn dump_query(&self, name: &str, problem: &IlpProblem) -> Result<()> {
        if !self.dump_all_queries {
            return Ok(());
        }
        let file = self.root.join(format!("{name}.lp"));
        std::fs::write(&file, problem.render_lp())?;
        debug!(file = %file.display(), "dumped ILP query");
        Ok(())
    }

    /// Save the basis matrix in its whitespace text form, if artifact
    /// keeping is on.
    pub fn save_matrix(&self, name: &str, matrix: &BasisMatrix) -> Result<()> {
        if !self.keep_ilp_artifacts {
            return Ok(());
        }
        let file = self.root.join(format!("{name}.txt"));
        std::fs::write(&file, matrix.to_text())?;
        debug!(file = %file.display(), "saved basis matrix");
        Ok(())
    }

    /// Save a DOT snapshot of the DAG, optionally with a highlighted path.
    pub fn save_dot(
        &self,
        name: &str,
        dag: &ControlFlowDag,
        highlight: Option<&[Edge]>,
    ) -> Result<()> {
        if !self.keep_ilp_artifacts {
            return Ok(());
        }
        let file = self.root.join(format!("{name}.dot"));
        dot::write_dot_file(dag, &file, highlight)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ilp::domain::{LinExpr, Sense};

    fn debug_config(keep_ilp_artifacts: bool) -> DebugConfig {
        DebugConfig {
            keep_ilp_artifacts,
            ..DebugConfig::default()
        }
    }

    #[test]
    fn test_artifacts_skipped_when_disabled() {
        let scratch = Scratch::in_temp(&debug_config(false)).unwrap();
        let problem = IlpProblem::new("noop", Sense::Maximize);
        scratch.save_problem("noop", &problem).unwrap();
        assert!(!scratch.root().join("noop.lp").exists());
    }

    #[test]
    fn test_problem_artifact_written() {
        let scratch = Scratch::in_temp(&debug_config(true)).unwrap();
        let mut problem = IlpProblem::new("demo", Sense::Maximize);
        let x = problem.add_binary("x");
        problem.set_objective(LinExpr::term(x, 1.0), Sense::Maximize);
        scratch.save_problem("demo", &problem).unwrap();
        let text = std::fs::read_to_string(scratch.root().join("demo.lp")).unwrap();
        assert!(text.contains("Maximize"));
    }

    #[test]
    fn test_scratch_dir_survives_drop_when_kept() {
        let kept = DebugConfig {
            keep_scratch_dir: true,
            ..DebugConfig::default()
        };
        let root = {
            let scratch = Scratch::in_temp(&kept).unwrap();
            scratch.root().to_path_buf()
        };
        assert!(root.exists());
        std::fs::remove_dir_all(&root).unwrap();

        let root = {
            let scratch = Scratch::in_temp(&DebugConfig::default()).unwrap();
            scratch.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_query_dump_follows_its_own_flag() {
        let dumping = DebugConfig {
            dump_all_queries: true,
            ..DebugConfig::default()
        };
        let scratch = Scratch::in_temp(&dumping).unwrap();
        let problem = IlpProblem::new("q", Sense::Maximize);
        scratch.dump_query("query-path-0", &problem).unwrap();
        assert!(scratch.root().join("query-path-0.lp").exists());
        // Plain artifact saving stays off.
        scratch.save_problem("kept", &problem).unwrap();
        assert!(!scratch.root().join("kept.lp").exists());
    }
}
