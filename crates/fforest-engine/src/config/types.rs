//! Experiment configuration types (deserialized from YAML).
//!
//! Every key is optional; missing keys take the defaults documented on each
//! field. The resolved values end up in
//! [`ExperimentParameters`](fforest_types::ExperimentParameters) during the
//! parse phase.

use std::path::PathBuf;

use fforest_types::{
    ClusteringTreesMethod, ColumnRef, Dialect, EntropyMeasure, QualityComputingMethod,
    SplittingMethod, TableFormat, Verbosity,
};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_TRAINING_VALUE: &str = "0.8";
pub const DEFAULT_REFERENCE_VALUE: &str = "0.2";
pub const DEFAULT_ENTROPY_THRESHOLD: &str = "0.01";
pub const DEFAULT_TREE_BUILDER: &str = "Salammbo";

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Top-level experiment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    /// Dialect of the user-supplied table.
    #[serde(default)]
    pub input: Dialect,
    /// Dialect of every table the pipeline writes.
    #[serde(default)]
    pub output: Dialect,
    /// Identifier column; when absent an `ID` column is generated.
    #[serde(default)]
    pub identifier: Option<ColumnRef>,
    /// Class column (default: last column). `null` disables class-aware steps.
    #[serde(default = "default_class_column")]
    pub class: Option<ColumnRef>,
    #[serde(default = "default_true")]
    pub have_header: bool,
    #[serde(default = "default_format")]
    pub format: TableFormat,
    #[serde(default)]
    pub initial_split: SplitConfig,
    #[serde(default)]
    pub reference_split: SplitConfig,
    #[serde(default)]
    pub subsubtrain_split: SubsubtrainSplitConfig,
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub names: NamesConfig,
    #[serde(default = "default_verbosity")]
    pub verbosity: Verbosity,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            input: Dialect::default(),
            output: Dialect::default(),
            identifier: None,
            class: default_class_column(),
            have_header: true,
            format: default_format(),
            initial_split: SplitConfig::default(),
            reference_split: SplitConfig::default(),
            subsubtrain_split: SubsubtrainSplitConfig::default(),
            forest: ForestConfig::default(),
            quality: QualityConfig::default(),
            clustering: ClusteringConfig::default(),
            names: NamesConfig::default(),
            verbosity: default_verbosity(),
        }
    }
}

impl ExperimentConfig {
    /// Row limit of the train table (`initial_split.value`, default `0.8`).
    #[must_use]
    pub fn training_value(&self) -> &str {
        self.initial_split
            .value
            .as_deref()
            .unwrap_or(DEFAULT_TRAINING_VALUE)
    }

    /// Row limit of the reference table (`reference_split.value`, default `0.2`).
    #[must_use]
    pub fn reference_value(&self) -> &str {
        self.reference_split
            .value
            .as_deref()
            .unwrap_or(DEFAULT_REFERENCE_VALUE)
    }

    /// Methods of the three splits, in pipeline order.
    #[must_use]
    pub fn split_methods(&self) -> [(&'static str, SplittingMethod); 3] {
        [
            ("initial_split", self.initial_split.method),
            ("reference_split", self.reference_split.method),
            ("subsubtrain_split", self.subsubtrain_split.method),
        ]
    }
}

#[allow(clippy::unnecessary_wraps)]
fn default_class_column() -> Option<ColumnRef> {
    Some(ColumnRef::Index(-1))
}

fn default_true() -> bool {
    true
}

fn default_format() -> TableFormat {
    TableFormat::Csv
}

fn default_verbosity() -> Verbosity {
    Verbosity::Normal
}

// ---------------------------------------------------------------------------
// Splits
// ---------------------------------------------------------------------------

/// A two-way split: method plus the row limit of its first output.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_sequential")]
    pub method: SplittingMethod,
    /// Fraction of rows given to the first output, as written in the file.
    #[serde(default, deserialize_with = "deserialize_optional_scalar")]
    pub value: Option<String>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            method: default_sequential(),
            value: None,
        }
    }
}

fn default_sequential() -> SplittingMethod {
    SplittingMethod::Sequential
}

/// The split of the subtrain table into one table per tree.
#[derive(Debug, Clone, Deserialize)]
pub struct SubsubtrainSplitConfig {
    #[serde(default = "default_stratified")]
    pub method: SplittingMethod,
}

impl Default for SubsubtrainSplitConfig {
    fn default() -> Self {
        Self {
            method: default_stratified(),
        }
    }
}

fn default_stratified() -> SplittingMethod {
    SplittingMethod::Stratified
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

/// Maximum number of tree-builder processes alive at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parallelism {
    /// One process per available core.
    #[default]
    Auto,
    Manual(u32),
}

impl Parallelism {
    /// Effective worker count (never zero).
    #[must_use]
    pub fn resolve(self) -> u32 {
        match self {
            Self::Manual(value) => value.max(1),
            Self::Auto => {
                let cores = std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1);
                u32::try_from(cores).unwrap_or(u32::MAX)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Parallelism {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(value) => Ok(Self::Manual(value)),
            Raw::Text(text) if text.trim().eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            Raw::Text(text) => text
                .trim()
                .parse::<u32>()
                .map(Self::Manual)
                .map_err(|_| {
                    serde::de::Error::custom(format!(
                        "invalid parallelism '{text}': expected 'auto' or a positive integer"
                    ))
                }),
        }
    }
}

/// Forest construction settings, forwarded to the tree builder.
#[derive(Debug, Clone, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_trees")]
    pub trees: u32,
    /// Highest norm id evaluated; the builder reports `t_norms + 1` norms.
    #[serde(default = "default_t_norms")]
    pub t_norms: u32,
    #[serde(default)]
    pub discretization_threshold: u32,
    #[serde(default)]
    pub entropy_measure: Option<EntropyMeasure>,
    #[serde(
        default = "default_entropy_threshold",
        deserialize_with = "deserialize_optional_scalar"
    )]
    pub entropy_threshold: Option<String>,
    #[serde(default = "default_min_size_leaf")]
    pub min_size_leaf: u32,
    #[serde(default = "default_tree_builder")]
    pub tree_builder: PathBuf,
    #[serde(default)]
    pub parallelism: Parallelism,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            trees: default_trees(),
            t_norms: default_t_norms(),
            discretization_threshold: 0,
            entropy_measure: None,
            entropy_threshold: default_entropy_threshold(),
            min_size_leaf: default_min_size_leaf(),
            tree_builder: default_tree_builder(),
            parallelism: Parallelism::Auto,
        }
    }
}

fn default_trees() -> u32 {
    10
}

fn default_t_norms() -> u32 {
    3
}

#[allow(clippy::unnecessary_wraps)]
fn default_entropy_threshold() -> Option<String> {
    Some(DEFAULT_ENTROPY_THRESHOLD.to_string())
}

fn default_min_size_leaf() -> u32 {
    10
}

fn default_tree_builder() -> PathBuf {
    PathBuf::from(DEFAULT_TREE_BUILDER)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_quality_method")]
    pub method: QualityComputingMethod,
    /// Fraction in `[0, 1]`; also scales the clustering hypersphere.
    #[serde(default = "default_quality_threshold")]
    pub threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            method: default_quality_method(),
            threshold: default_quality_threshold(),
        }
    }
}

fn default_quality_method() -> QualityComputingMethod {
    QualityComputingMethod::KappaRifqiMarsala
}

fn default_quality_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_clustering_method")]
    pub method: ClusteringTreesMethod,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            method: default_clustering_method(),
        }
    }
}

fn default_clustering_method() -> ClusteringTreesMethod {
    ClusteringTreesMethod::Hypersphere
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// File names, directory names and artifact prefixes.
///
/// Table names are given without extension; the extension of the output
/// format is appended.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NamesConfig {
    /// Run directory name; defaults to the stem of the input table.
    pub main_directory: Option<String>,
    pub train: String,
    pub test: String,
    pub reference: String,
    pub subtrain: String,
    pub subtrain_directory: String,
    /// Prefix of every per-tree directory and table.
    pub subsubtrain_prefix: String,
    pub header: String,
    pub statistics: String,
    pub classes_matrices_directory: String,
    pub cclassified_vector_prefix: String,
    pub membership_prefix: String,
    pub difficulty_vector_prefix: String,
    pub quality_file_prefix: String,
    pub cluster_file_prefix: String,
    pub class_matrix_prefix: String,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            main_directory: None,
            train: "train".into(),
            test: "test".into(),
            reference: "reference".into(),
            subtrain: "subtrain".into(),
            subtrain_directory: "subtrain".into(),
            subsubtrain_prefix: "subsubtrain_".into(),
            header: "header.txt".into(),
            statistics: "statistics.json".into(),
            classes_matrices_directory: "classes_matrices".into(),
            cclassified_vector_prefix: "cclassified_vector_".into(),
            membership_prefix: "membership_".into(),
            difficulty_vector_prefix: "difficulty_vector_".into(),
            quality_file_prefix: "quality_".into(),
            cluster_file_prefix: "clusters_".into(),
            class_matrix_prefix: "matrix_".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

/// Accept a YAML string, integer or float and keep its textual form.
///
/// Floats are rendered with `{:?}` so that `1.0` stays `1.0`; the row-limit
/// policy relies on the decimal point being preserved.
fn deserialize_optional_scalar<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Int(value) => value.to_string(),
        Scalar::Float(value) => format!("{value:?}"),
        Scalar::Text(value) => value,
    }))
}
