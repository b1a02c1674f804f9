pub mod check;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use fforest_engine::{parse_experiment, ExperimentConfig};

/// Experiment configuration from `path`, or the defaults without one.
pub fn load_config(path: Option<&Path>) -> Result<ExperimentConfig> {
    match path {
        Some(path) => parse_experiment(path)
            .with_context(|| format!("Failed to parse experiment: {}", path.display())),
        None => Ok(ExperimentConfig::default()),
    }
}
