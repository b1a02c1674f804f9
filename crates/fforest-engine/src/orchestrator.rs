//! Pipeline driver: wires every phase entry point into the resumable state
//! machine.

use std::path::PathBuf;
use std::time::Instant;

use fforest_state::{JsonFileSnapshotStore, SnapshotStore};
use fforest_types::{Phase, RunState};

use crate::config::types::ExperimentConfig;
use crate::errors::PipelineError;
use crate::execution::{RunOptions, RunOutcome};
use crate::parse::ResolvedColumns;
use crate::phase::{prepare_run, run_phases, StageTable};
use crate::{
    class_matrices, clustering, construction, ending, layout, parse, preprocess, quality,
    reduction, split,
};

/// Stage table of the real pipeline.
pub struct PipelineStages<'a> {
    config: &'a ExperimentConfig,
    options: &'a RunOptions,
}

impl<'a> PipelineStages<'a> {
    #[must_use]
    pub fn new(config: &'a ExperimentConfig, options: &'a RunOptions) -> Self {
        Self { config, options }
    }
}

impl StageTable for PipelineStages<'_> {
    async fn execute(&self, phase: Phase, state: &mut RunState) -> Result<(), PipelineError> {
        match phase {
            Phase::Parse => parse::execute(self.config, self.options, state),
            Phase::Preprocess => preprocess::execute(state),
            Phase::InitialSplit => split::initial(state),
            Phase::ReferenceSplit => split::reference(state),
            Phase::SubsubtrainSplit => split::subsubtrain(state),
            Phase::Construct => construction::execute(state).await.map(|_| ()),
            Phase::Reduce => reduction::execute(state),
            Phase::Quality => quality::execute(state),
            Phase::ClassMatrices => class_matrices::execute(state),
            Phase::ClusterTrees => clustering::execute(state),
            Phase::End => ending::execute(state).map(|_| ()),
        }
    }
}

/// Run directory of an experiment, where its snapshot lives.
#[must_use]
pub fn run_directory(config: &ExperimentConfig, options: &RunOptions) -> PathBuf {
    let mut config = config.clone();
    options.apply_to(&mut config);
    layout::main_directory(&options.parent_dir, &options.database, &config.names)
}

/// Run an experiment, persisting its snapshot in the run directory.
///
/// # Errors
///
/// Returns the first phase error; see [`run_experiment_with_store`].
pub async fn run_experiment(
    config: &ExperimentConfig,
    options: &RunOptions,
) -> Result<RunOutcome, PipelineError> {
    let store = JsonFileSnapshotStore::in_directory(&run_directory(config, options));
    run_experiment_with_store(config, options, &store).await
}

/// Run an experiment against an explicit snapshot store.
///
/// # Errors
///
/// Returns configuration and resume errors before anything is written, and
/// the first phase error otherwise (after the best-effort snapshot).
pub async fn run_experiment_with_store(
    config: &ExperimentConfig,
    options: &RunOptions,
    store: &dyn SnapshotStore,
) -> Result<RunOutcome, PipelineError> {
    let started = Instant::now();
    let mut config = config.clone();
    options.apply_to(&mut config);

    let (mut state, start) = prepare_run(store, options.resume_phase, options.last_phase)?;
    if start != Phase::Parse {
        if let (Some(builder), Some(params)) = (&options.tree_builder, state.parameters.as_mut()) {
            params.tree_builder.clone_from(builder);
        }
    }

    tracing::info!(
        database = %options.database.display(),
        start_phase = %start,
        last_phase = %options.last_phase,
        snapshot = store.location(),
        "Starting experiment"
    );

    let stages = PipelineStages::new(&config, options);
    let executed = run_phases(start, &mut state, &stages, store).await?;

    let main_directory = state
        .layout
        .as_ref()
        .map_or_else(|| run_directory(&config, options), |layout| layout.main_directory.clone());
    let statistics_file = state
        .layout
        .as_ref()
        .map(|layout| layout.statistics_file.clone())
        .filter(|path| path.is_file());

    Ok(RunOutcome {
        main_directory,
        executed,
        statistics: state.statistics,
        statistics_file,
        duration_secs: started.elapsed().as_secs_f64(),
    })
}

/// Result of a dry check of an experiment.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub main_directory: PathBuf,
    pub columns: ResolvedColumns,
    pub trees: u32,
    pub norms: Vec<String>,
}

/// Validate the configuration and resolve its columns against the input
/// table without writing anything.
///
/// # Errors
///
/// Returns configuration and column resolution errors.
pub fn check_experiment(
    config: &ExperimentConfig,
    options: &RunOptions,
) -> Result<CheckReport, PipelineError> {
    let mut config = config.clone();
    options.apply_to(&mut config);
    let columns = parse::inspect(&config, options)?;
    Ok(CheckReport {
        main_directory: layout::main_directory(&options.parent_dir, &options.database, &config.names),
        columns,
        trees: config.forest.trees,
        norms: fforest_types::norm_names(config.forest.t_norms),
    })
}

#[cfg(test)]
mod tests {
    use fforest_state::MemorySnapshotStore;

    use super::*;

    fn write_input(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("data.csv");
        let mut content = String::from("x,class\n");
        for i in 0..10 {
            content.push_str(&format!("{i},{}\n", if i < 6 { "A" } else { "B" }));
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn stopping_after_splits_writes_tables_and_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            parent_dir: dir.path().to_path_buf(),
            last_phase: Phase::ReferenceSplit,
            ..RunOptions::new(write_input(dir.path()))
        };
        let store = MemorySnapshotStore::new();

        let outcome = run_experiment_with_store(&ExperimentConfig::default(), &options, &store)
            .await
            .unwrap();

        assert_eq!(
            outcome.executed,
            [
                Phase::Parse,
                Phase::Preprocess,
                Phase::InitialSplit,
                Phase::ReferenceSplit,
                Phase::End
            ]
        );
        assert_eq!(outcome.statistics.train_rows, Some(8));
        assert!(outcome.statistics_file.is_some());
        assert_eq!(outcome.main_directory, dir.path().join("data"));
        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.last_completed_phase, Some(Phase::ReferenceSplit));
    }

    #[test]
    fn check_resolves_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            parent_dir: dir.path().to_path_buf(),
            ..RunOptions::new(write_input(dir.path()))
        };
        let report = check_experiment(&ExperimentConfig::default(), &options).unwrap();
        assert_eq!(report.columns.classes, ["A", "B"]);
        assert_eq!(report.norms.len(), 4);
        assert!(!report.main_directory.exists());
    }

    #[test]
    fn run_directory_honours_override() {
        let options = RunOptions {
            parent_dir: PathBuf::from("/runs"),
            main_directory: Some("exp1".into()),
            ..RunOptions::new("/data/iris.csv")
        };
        assert_eq!(
            run_directory(&ExperimentConfig::default(), &options),
            PathBuf::from("/runs/exp1")
        );
    }
}
