//! Run-state model: everything needed to resume the pipeline at any phase.
//!
//! The run state is populated incrementally, one phase at a time, and is
//! persisted after each of them. Every section is optional (or defaults to
//! empty) so that a partially-populated state can always be written.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::method::{
    ClusteringTreesMethod, EntropyMeasure, QualityComputingMethod, SplittingMethod, TableFormat,
    Verbosity,
};
use crate::phase::Phase;

// ---------------------------------------------------------------------------
// Column references
// ---------------------------------------------------------------------------

/// A column given either by (possibly negative) index or by header name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(i64),
    Name(String),
}

impl ColumnRef {
    /// Interpret a command-line value: integers are indices, anything else a
    /// header name.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value
            .trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Name(value.to_string()), Self::Index)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Experiment parameters after configuration merging and column resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentParameters {
    /// Path of the user-supplied input table.
    pub database: PathBuf,
    pub dialect_input: Dialect,
    pub dialect_output: Dialect,
    pub format_output: TableFormat,
    /// Whether the input table starts with a header row.
    pub have_header: bool,
    /// Identifier column of the input table; `None` means one is generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<usize>,
    /// Class column of the input table; `None` when the run has no class column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_column: Option<usize>,
    /// Class column of the preprocessed tables (always the last one), set
    /// once preprocessing has run. Preprocessed tables have the identifier
    /// in column 0 and no header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessed_class_column: Option<usize>,
    pub initial_split_method: SplittingMethod,
    pub training_value: String,
    pub reference_split_method: SplittingMethod,
    pub reference_value: String,
    pub subsubtrain_split_method: SplittingMethod,
    pub trees_in_forest: u32,
    pub t_norms: u32,
    pub discretization_threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_measure: Option<EntropyMeasure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_threshold: Option<String>,
    pub min_size_leaf: u32,
    pub tree_builder: PathBuf,
    /// Maximum number of tree-builder processes alive at once.
    pub parallelism: u32,
    pub quality_computing_method: QualityComputingMethod,
    pub quality_threshold: f64,
    pub clustering_trees_method: ClusteringTreesMethod,
    pub verbosity: Verbosity,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Working directory and artifacts of one tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeLayout {
    /// Tree name, e.g. `subsubtrain_03`.
    pub name: String,
    pub directory: PathBuf,
    /// The subsubtrain table the tree is built from.
    pub table: PathBuf,
    /// Norm name -> 0/1 classification vector.
    pub classification_vectors: BTreeMap<String, PathBuf>,
    /// Norm name -> membership table.
    pub membership_tables: BTreeMap<String, PathBuf>,
}

/// Every path the pipeline reads or writes, derived once during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLayout {
    pub main_directory: PathBuf,
    pub preprocessed_table: PathBuf,
    pub header_file: PathBuf,
    pub train_table: PathBuf,
    pub test_table: PathBuf,
    pub subtrain_directory: PathBuf,
    pub reference_table: PathBuf,
    pub subtrain_table: PathBuf,
    pub trees: Vec<TreeLayout>,
    /// Norm name -> difficulty vector.
    pub difficulty_vectors: BTreeMap<String, PathBuf>,
    /// Norm name -> per-tree quality file.
    pub quality_files: BTreeMap<String, PathBuf>,
    /// Norm name -> tree cluster file.
    pub cluster_files: BTreeMap<String, PathBuf>,
    pub classes_matrices_directory: PathBuf,
    /// Class -> norm name -> class matrix.
    pub class_matrices: BTreeMap<String, BTreeMap<String, PathBuf>>,
    pub statistics_file: PathBuf,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Row counts recorded by the preprocessing and split phases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtrain_rows: Option<usize>,
    /// Tree name -> rows in its subsubtrain table.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subsubtrain_rows: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Full state of an experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Phase being executed (or about to be).
    pub current_phase: Phase,
    /// Phase after which the user asked the pipeline to stop.
    pub last_phase: Phase,
    /// Most recent phase that finished successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ExperimentParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<RunLayout>,
    /// Distinct class values of the input table, sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_classes: Vec<String>,
    /// Evaluation norm names, in builder id order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub norms: Vec<String>,
    #[serde(default)]
    pub statistics: RunStatistics,
}

impl RunState {
    /// Empty state for a fresh run stopping after `last_phase`.
    #[must_use]
    pub fn new(last_phase: Phase) -> Self {
        Self {
            current_phase: Phase::Parse,
            last_phase,
            last_completed_phase: None,
            parameters: None,
            layout: None,
            possible_classes: Vec::new(),
            norms: Vec::new(),
            statistics: RunStatistics::default(),
        }
    }
}
