//! Runtime options of a pipeline invocation (not part of the experiment YAML).

use std::path::PathBuf;

use fforest_types::{Phase, RunStatistics};

use crate::config::types::ExperimentConfig;

/// Options given on the command line for one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Input table.
    pub database: PathBuf,
    /// Directory in which the run directory is created.
    pub parent_dir: PathBuf,
    /// Run directory name; overrides `names.main_directory`.
    pub main_directory: Option<String>,
    /// Phase to resume at, using the persisted snapshot.
    pub resume_phase: Option<Phase>,
    /// Phase after which the run stops (the end phase still runs).
    pub last_phase: Phase,
    /// Overrides `forest.tree_builder`.
    pub tree_builder: Option<PathBuf>,
    /// Overrides `forest.trees`.
    pub trees: Option<u32>,
}

impl RunOptions {
    /// Options for a full run of `database` inside the current directory.
    #[must_use]
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            parent_dir: PathBuf::from("."),
            main_directory: None,
            resume_phase: None,
            last_phase: Phase::End,
            tree_builder: None,
            trees: None,
        }
    }

    /// Apply the command-line overrides to `config`.
    pub fn apply_to(&self, config: &mut ExperimentConfig) {
        if let Some(name) = &self.main_directory {
            config.names.main_directory = Some(name.clone());
        }
        if let Some(tree_builder) = &self.tree_builder {
            config.forest.tree_builder.clone_from(tree_builder);
        }
        if let Some(trees) = self.trees {
            config.forest.trees = trees;
        }
    }
}

/// Summary of a finished (or stopped) run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub main_directory: PathBuf,
    /// Phases executed by this invocation, in order.
    pub executed: Vec<Phase>,
    pub statistics: RunStatistics,
    pub statistics_file: Option<PathBuf>,
    pub duration_secs: f64,
}
