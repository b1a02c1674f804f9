//! Phase state machine, partitioning engine and forest aggregation for
//! fforest experiments.

#![warn(clippy::pedantic)]

pub mod class_matrices;
pub mod clustering;
pub mod config;
pub mod construction;
pub mod ending;
pub mod errors;
pub mod execution;
pub mod layout;
pub mod orchestrator;
pub mod parse;
pub mod partition;
pub mod phase;
pub mod preprocess;
pub mod quality;
pub mod reduction;
pub mod split;
pub mod table;

// Re-export public API for convenience
pub use config::parser::{parse_experiment, parse_experiment_str};
pub use config::types::ExperimentConfig;
pub use errors::PipelineError;
pub use execution::{RunOptions, RunOutcome};
pub use orchestrator::{check_experiment, run_experiment, run_experiment_with_store, CheckReport};
pub use partition::{convert_row_limit, RowLimit};
pub use phase::{compute_resume_point, StageTable};
