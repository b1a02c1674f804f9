//! Command line of the external tree builder.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use fforest_types::{EntropyMeasure, ExperimentParameters};

use crate::errors::PipelineError;

/// Flags passed on every invocation.
pub const MANDATORY_OPTIONS: [&str; 4] = ["-R", "-L", "-M", "-N"];

/// Options derived from the experiment parameters, without the mandatory
/// flags and the table paths.
#[must_use]
pub fn builder_options(params: &ExperimentParameters) -> Vec<String> {
    let mut options = vec!["-c".to_string(), params.discretization_threshold.to_string()];
    if params.entropy_measure == Some(EntropyMeasure::Shannon) {
        options.push("-u".to_string());
    }
    options.push("-f".to_string());
    options.push(params.t_norms.to_string());
    if let Some(threshold) = &params.entropy_threshold {
        options.push("-e".to_string());
        options.push(threshold.clone());
    }
    options.push("-I".to_string());
    options.push(params.min_size_leaf.to_string());
    options
}

/// One invocation of the tree builder.
#[derive(Debug, Clone)]
pub struct TreeBuilderCommand {
    pub program: PathBuf,
    pub options: Vec<String>,
}

impl TreeBuilderCommand {
    #[must_use]
    pub fn new(params: &ExperimentParameters) -> Self {
        Self {
            program: params.tree_builder.clone(),
            options: builder_options(params),
        }
    }

    /// Full argument list for one tree.
    #[must_use]
    pub fn arguments(&self, subsubtrain: &Path, reference: &Path) -> Vec<String> {
        MANDATORY_OPTIONS
            .iter()
            .map(ToString::to_string)
            .chain(self.options.iter().cloned())
            .chain([
                subsubtrain.display().to_string(),
                reference.display().to_string(),
            ])
            .collect()
    }

    /// Run the builder for `tree` and return its standard output.
    ///
    /// No timeout is applied: a builder that never exits blocks the caller.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TreeBuilder`] when the process cannot be
    /// started or exits unsuccessfully.
    pub async fn run(
        &self,
        tree: &str,
        subsubtrain: &Path,
        reference: &Path,
    ) -> Result<String, PipelineError> {
        let arguments = self.arguments(subsubtrain, reference);
        tracing::debug!(
            tree,
            program = %self.program.display(),
            args = %arguments.join(" "),
            "Spawning tree builder"
        );

        let output = tokio::process::Command::new(&self.program)
            .args(&arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::TreeBuilder {
                tree: tree.to_string(),
                reason: format!("failed to start {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::TreeBuilder {
                tree: tree.to_string(),
                reason: format!("{} ({})", output.status, stderr.trim()),
            });
        }

        tracing::debug!(
            tree,
            stdout_bytes = output.stdout.len(),
            "Tree builder exited"
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ExperimentConfig;
    use crate::execution::RunOptions;

    fn parameters() -> ExperimentParameters {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("d.csv");
        std::fs::write(&database, "a,class\n1,x\n").unwrap();
        let options = RunOptions {
            parent_dir: dir.path().to_path_buf(),
            ..RunOptions::new(database)
        };
        let mut state = fforest_types::RunState::new(fforest_types::Phase::End);
        crate::parse::execute(&ExperimentConfig::default(), &options, &mut state).unwrap();
        state.parameters.unwrap()
    }

    #[test]
    fn default_options() {
        let params = parameters();
        assert_eq!(
            builder_options(&params),
            ["-c", "0", "-f", "3", "-e", "0.01", "-I", "10"]
        );
    }

    #[test]
    fn shannon_adds_flag_and_missing_threshold_drops_option() {
        let mut params = parameters();
        params.entropy_measure = Some(EntropyMeasure::Shannon);
        params.entropy_threshold = None;
        params.t_norms = 2;
        assert_eq!(
            builder_options(&params),
            ["-c", "0", "-u", "-f", "2", "-I", "10"]
        );
    }

    #[test]
    fn arguments_end_with_both_tables() {
        let command = TreeBuilderCommand::new(&parameters());
        let args = command.arguments(Path::new("/t/sub.csv"), Path::new("/t/ref.csv"));
        assert_eq!(&args[..4], MANDATORY_OPTIONS);
        assert_eq!(&args[args.len() - 2..], ["/t/sub.csv", "/t/ref.csv"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_builder_reports_status() {
        let command = TreeBuilderCommand {
            program: PathBuf::from("false"),
            options: Vec::new(),
        };
        let err = command
            .run("tree_1", Path::new("a"), Path::new("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TreeBuilder { ref tree, .. } if tree == "tree_1"));
    }

    #[tokio::test]
    async fn missing_program_is_a_builder_error() {
        let command = TreeBuilderCommand {
            program: PathBuf::from("/nonexistent/fforest-builder"),
            options: Vec::new(),
        };
        let err = command
            .run("tree_1", Path::new("a"), Path::new("b"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }
}
