//! Parse phase: turn configuration and command-line options into the
//! initial run state.

use std::collections::BTreeSet;

use fforest_types::{norm_names, ExperimentParameters, Phase, RunState, RunStatistics};

use crate::config::types::ExperimentConfig;
use crate::config::validator::validate_experiment;
use crate::errors::PipelineError;
use crate::execution::RunOptions;
use crate::layout::{build_layout, LayoutSpec};
use crate::table;

/// Columns of the input table after reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub identifier: Option<usize>,
    pub class: Option<usize>,
    pub width: usize,
    pub rows: usize,
    /// Distinct class values, sorted.
    pub classes: Vec<String>,
}

/// Validate `config` and resolve its column references against the input
/// table, without writing anything.
///
/// # Errors
///
/// Returns configuration errors, column resolution errors and I/O failures.
pub fn inspect(
    config: &ExperimentConfig,
    options: &RunOptions,
) -> Result<ResolvedColumns, PipelineError> {
    validate_experiment(config)?;

    let input = table::read_table(&options.database, &config.input, config.have_header)?;
    let width = input.width();
    let header = input.header.as_ref();

    let identifier = config
        .identifier
        .as_ref()
        .map(|column| table::resolve_column(column, header, width))
        .transpose()?;
    let class = config
        .class
        .as_ref()
        .map(|column| table::resolve_column(column, header, width))
        .transpose()?;

    if let (Some(identifier), Some(class)) = (identifier, class) {
        if identifier == class {
            return Err(PipelineError::Config(vec![format!(
                "identifier and class resolve to the same column ({identifier})"
            )]));
        }
    }

    let mut classes = BTreeSet::new();
    if let Some(class) = class {
        for row in &input.rows {
            classes.insert(table::field(row, class)?.to_string());
        }
    }

    Ok(ResolvedColumns {
        identifier,
        class,
        width,
        rows: input.rows.len(),
        classes: classes.into_iter().collect(),
    })
}

/// Execute the parse phase.
///
/// # Errors
///
/// Returns configuration errors (including a missing class column when the
/// run goes past the splits) and column resolution errors.
pub fn execute(
    config: &ExperimentConfig,
    options: &RunOptions,
    state: &mut RunState,
) -> Result<(), PipelineError> {
    let columns = inspect(config, options)?;
    if columns.class.is_none() && state.last_phase > Phase::SubsubtrainSplit {
        return Err(PipelineError::MissingClassificationAttribute {
            needed_by: "forest construction".to_string(),
        });
    }

    let norms = norm_names(config.forest.t_norms);
    let layout = build_layout(&LayoutSpec {
        parent_dir: &options.parent_dir,
        database: &options.database,
        names: &config.names,
        format: config.format,
        trees: config.forest.trees,
        norms: &norms,
        classes: &columns.classes,
    });

    let parameters = ExperimentParameters {
        database: options.database.clone(),
        dialect_input: config.input.clone(),
        dialect_output: config.output.clone(),
        format_output: config.format,
        have_header: config.have_header,
        identifier: columns.identifier,
        class_column: columns.class,
        preprocessed_class_column: None,
        initial_split_method: config.initial_split.method,
        training_value: config.training_value().to_string(),
        reference_split_method: config.reference_split.method,
        reference_value: config.reference_value().to_string(),
        subsubtrain_split_method: config.subsubtrain_split.method,
        trees_in_forest: config.forest.trees,
        t_norms: config.forest.t_norms,
        discretization_threshold: config.forest.discretization_threshold,
        entropy_measure: config.forest.entropy_measure,
        entropy_threshold: config.forest.entropy_threshold.clone(),
        min_size_leaf: config.forest.min_size_leaf,
        tree_builder: config.forest.tree_builder.clone(),
        parallelism: config.forest.parallelism.resolve(),
        quality_computing_method: config.quality.method,
        quality_threshold: config.quality.threshold,
        clustering_trees_method: config.clustering.method,
        verbosity: config.verbosity,
    };

    tracing::info!(
        database = %options.database.display(),
        main_directory = %layout.main_directory.display(),
        rows = columns.rows,
        classes = columns.classes.len(),
        trees = parameters.trees_in_forest,
        norms = norms.len(),
        "Experiment parsed"
    );

    state.parameters = Some(parameters);
    state.layout = Some(layout);
    state.possible_classes = columns.classes;
    state.norms = norms;
    state.statistics = RunStatistics::default();
    Ok(())
}

#[cfg(test)]
mod tests {
    use fforest_types::ColumnRef;

    use super::*;

    fn write_input(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("iris.csv");
        std::fs::write(
            &path,
            "sepal,petal,species\n1,2,b\n3,4,a\n5,6,b\n7,8,c\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn parse_populates_parameters_layout_and_classes() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            parent_dir: dir.path().to_path_buf(),
            ..RunOptions::new(write_input(dir.path()))
        };
        let mut config = ExperimentConfig::default();
        config.forest.trees = 2;
        config.forest.t_norms = 1;
        let mut state = RunState::new(Phase::End);

        execute(&config, &options, &mut state).unwrap();

        let params = state.parameters.as_ref().unwrap();
        assert_eq!(params.class_column, Some(2));
        assert_eq!(params.identifier, None);
        assert_eq!(state.possible_classes, ["a", "b", "c"]);
        assert_eq!(state.norms, ["classic", "zadeh"]);
        let layout = state.layout.as_ref().unwrap();
        assert_eq!(layout.main_directory, dir.path().join("iris"));
        assert_eq!(layout.trees.len(), 2);
        assert_eq!(layout.class_matrices.len(), 3);
        assert!(!layout.main_directory.exists(), "parse must not write");
    }

    #[test]
    fn class_by_name_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(write_input(dir.path()));
        let config = ExperimentConfig {
            class: Some(ColumnRef::Name("species".into())),
            identifier: Some(ColumnRef::Index(0)),
            ..ExperimentConfig::default()
        };
        let columns = inspect(&config, &options).unwrap();
        assert_eq!(columns.class, Some(2));
        assert_eq!(columns.identifier, Some(0));
        assert_eq!(columns.rows, 4);
    }

    #[test]
    fn out_of_bounds_class_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(write_input(dir.path()));
        let config = ExperimentConfig {
            class: Some(ColumnRef::Index(7)),
            ..ExperimentConfig::default()
        };
        let mut state = RunState::new(Phase::End);
        let err = execute(&config, &options, &mut state).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnOutOfBounds { index: 7, columns: 3 }));
        assert!(err.aborts_without_snapshot());
        assert!(state.parameters.is_none());
    }

    #[test]
    fn identifier_equal_to_class_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(write_input(dir.path()));
        let config = ExperimentConfig {
            identifier: Some(ColumnRef::Index(-1)),
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            inspect(&config, &options),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn missing_class_is_fatal_when_forest_is_built() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::new(write_input(dir.path()));
        let mut config = ExperimentConfig {
            class: None,
            ..ExperimentConfig::default()
        };
        config.subsubtrain_split.method = fforest_types::SplittingMethod::Sequential;

        let mut full = RunState::new(Phase::End);
        assert!(matches!(
            execute(&config, &options, &mut full),
            Err(PipelineError::MissingClassificationAttribute { .. })
        ));

        let mut splits_only = RunState::new(Phase::SubsubtrainSplit);
        execute(&config, &options, &mut splits_only).unwrap();
        assert!(splits_only.possible_classes.is_empty());
    }
}
