//! Derivation of every path of a run from the configured names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fforest_types::{RunLayout, TableFormat, TreeLayout};

use crate::config::types::NamesConfig;

/// Run directory: `<parent>/<main_directory>`, the latter defaulting to the
/// stem of the input table.
#[must_use]
pub fn main_directory(parent_dir: &Path, database: &Path, names: &NamesConfig) -> PathBuf {
    let name = names
        .main_directory
        .clone()
        .unwrap_or_else(|| file_stem(database));
    parent_dir.join(name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "fforest".to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Class values become directory and file names.
fn path_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// Name of tree `index` (1-based), zero-padded to the width of `trees`.
#[must_use]
pub fn tree_name(prefix: &str, index: u32, trees: u32) -> String {
    let width = trees.to_string().len();
    format!("{prefix}{index:0width$}")
}

/// Inputs of [`build_layout`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutSpec<'a> {
    pub parent_dir: &'a Path,
    pub database: &'a Path,
    pub names: &'a NamesConfig,
    pub format: TableFormat,
    pub trees: u32,
    pub norms: &'a [String],
    pub classes: &'a [String],
}

/// Compute the full layout of a run.
#[must_use]
pub fn build_layout(spec: &LayoutSpec<'_>) -> RunLayout {
    let names = spec.names;
    let ext = spec.format.extension();
    let table = |dir: &Path, name: &str| dir.join(format!("{name}.{ext}"));
    let per_norm = |dir: &Path, prefix: &str| -> BTreeMap<String, PathBuf> {
        spec.norms
            .iter()
            .map(|norm| (norm.clone(), dir.join(format!("{prefix}{norm}.{ext}"))))
            .collect()
    };

    let main = main_directory(spec.parent_dir, spec.database, names);
    let subtrain_directory = main.join(&names.subtrain_directory);

    let trees = (1..=spec.trees)
        .map(|index| {
            let name = tree_name(&names.subsubtrain_prefix, index, spec.trees);
            let directory = subtrain_directory.join(&name);
            TreeLayout {
                table: table(&directory, &name),
                classification_vectors: per_norm(&directory, &names.cclassified_vector_prefix),
                membership_tables: per_norm(&directory, &names.membership_prefix),
                name,
                directory,
            }
        })
        .collect();

    let classes_matrices_directory = subtrain_directory.join(&names.classes_matrices_directory);
    let class_matrices = spec
        .classes
        .iter()
        .map(|class| {
            let component = path_component(class);
            let directory = classes_matrices_directory.join(&component);
            let files = spec
                .norms
                .iter()
                .map(|norm| {
                    let file = format!("{}{component}_{norm}.{ext}", names.class_matrix_prefix);
                    (norm.clone(), directory.join(file))
                })
                .collect();
            (class.clone(), files)
        })
        .collect();

    RunLayout {
        preprocessed_table: main.join(format!("~{}.{ext}", file_stem(spec.database))),
        header_file: main.join(&names.header),
        train_table: table(&main, &names.train),
        test_table: table(&main, &names.test),
        reference_table: table(&subtrain_directory, &names.reference),
        subtrain_table: table(&subtrain_directory, &names.subtrain),
        trees,
        difficulty_vectors: per_norm(&subtrain_directory, &names.difficulty_vector_prefix),
        quality_files: per_norm(&subtrain_directory, &names.quality_file_prefix),
        cluster_files: per_norm(&subtrain_directory, &names.cluster_file_prefix),
        classes_matrices_directory,
        class_matrices,
        statistics_file: main.join(&names.statistics),
        subtrain_directory,
        main_directory: main,
    }
}
