//! End phase: dump the run statistics.

use std::collections::BTreeMap;
use std::fs;

use anyhow::Context;
use fforest_types::{Phase, RunState, RunStatistics};
use serde::Serialize;

use crate::errors::PipelineError;
use crate::phase::{layout, parameters};
use crate::quality::read_quality_file;

/// Content of the statistics file.
#[derive(Debug, Serialize)]
pub struct StatisticsReport<'a> {
    pub database: String,
    pub finished_at: String,
    pub last_phase: Phase,
    pub trees: u32,
    pub norms: &'a [String],
    pub possible_classes: &'a [String],
    #[serde(flatten)]
    pub rows: &'a RunStatistics,
    /// Quality of every tree, per norm, when the quality phase has run.
    pub quality: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Execute the end phase. Returns the path of the statistics file.
///
/// # Errors
///
/// Returns I/O failures.
pub fn execute(state: &RunState) -> Result<std::path::PathBuf, PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;

    let mut quality = BTreeMap::new();
    for norm in &state.norms {
        let Some(path) = layout.quality_files.get(norm) else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        let per_tree = read_quality_file(path, &params.dialect_output)?
            .into_iter()
            .collect();
        quality.insert(norm.clone(), per_tree);
    }

    let report = StatisticsReport {
        database: params.database.display().to_string(),
        finished_at: chrono::Utc::now().to_rfc3339(),
        last_phase: state.last_phase,
        trees: params.trees_in_forest,
        norms: &state.norms,
        possible_classes: &state.possible_classes,
        rows: &state.statistics,
        quality,
    };

    fs::create_dir_all(&layout.main_directory).with_context(|| {
        format!(
            "Failed to create main directory {}",
            layout.main_directory.display()
        )
    })?;
    let json = serde_json::to_string_pretty(&report)
        .context("Failed to serialize run statistics")?;
    fs::write(&layout.statistics_file, json).with_context(|| {
        format!(
            "Failed to write statistics file {}",
            layout.statistics_file.display()
        )
    })?;

    tracing::info!(
        statistics = %layout.statistics_file.display(),
        original_rows = ?state.statistics.original_rows,
        reference_rows = ?state.statistics.reference_rows,
        trees = params.trees_in_forest,
        "Experiment finished"
    );
    Ok(layout.statistics_file.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ExperimentConfig;
    use crate::execution::RunOptions;

    #[test]
    fn statistics_file_holds_counts_and_qualities() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("data.csv");
        std::fs::write(&database, "x,class\n1,A\n2,B\n").unwrap();
        let options = RunOptions {
            parent_dir: dir.path().to_path_buf(),
            ..RunOptions::new(database)
        };
        let mut state = RunState::new(Phase::End);
        crate::parse::execute(&ExperimentConfig::default(), &options, &mut state).unwrap();
        crate::preprocess::execute(&mut state).unwrap();

        let layout = state.layout.clone().unwrap();
        std::fs::create_dir_all(&layout.subtrain_directory).unwrap();
        std::fs::write(
            &layout.quality_files["classic"],
            "ID_tree,quality\nsubsubtrain_01,0.5\n",
        )
        .unwrap();

        let path = execute(&state).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["original_rows"], 2);
        assert_eq!(json["possible_classes"], serde_json::json!(["A", "B"]));
        assert_eq!(json["quality"]["classic"]["subsubtrain_01"], 0.5);
        assert!(json["quality"].get("zadeh").is_none());
    }
}
