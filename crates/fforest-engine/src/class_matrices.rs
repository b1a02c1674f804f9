//! ClassMatrices phase: for every possible class and norm, a matrix linking
//! each reference instance to the membership every tree gave that class.

use std::collections::HashMap;
use std::fs;

use anyhow::Context;
use csv::StringRecord;
use fforest_types::RunState;

use crate::construction::artifacts::{format_float, StoredMembershipTable, KEY_ID};
use crate::errors::PipelineError;
use crate::phase::{layout, parameters};
use crate::reduction::{forest_memberships, require_forest_artifacts};
use crate::table;

/// Rows of the matrix of `class`: `id, degree per tree`. Instances follow
/// the row order of the first tree; a tree that did not report an instance
/// contributes `0.0`.
#[must_use]
pub fn class_matrix(forest: &[(String, StoredMembershipTable)], class: &str) -> Vec<Vec<String>> {
    let Some((_, first)) = forest.first() else {
        return Vec::new();
    };
    let per_tree: Vec<HashMap<&str, f64>> = forest
        .iter()
        .map(|(_, memberships)| {
            memberships
                .rows
                .iter()
                .map(|row| (row.id.as_str(), memberships.degree(row, class)))
                .collect()
        })
        .collect();

    first
        .rows
        .iter()
        .map(|row| {
            let mut line = vec![row.id.clone()];
            line.extend(per_tree.iter().map(|degrees| {
                format_float(degrees.get(row.id.as_str()).copied().unwrap_or(0.0))
            }));
            line
        })
        .collect()
}

/// Execute the class matrices phase.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] when a tree artifact is
/// missing, and I/O failures.
pub fn execute(state: &RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;
    require_forest_artifacts(layout)?;

    let mut header = StringRecord::from(vec![KEY_ID]);
    for tree in &layout.trees {
        header.push_field(&tree.name);
    }

    for norm in &state.norms {
        let forest = forest_memberships(layout, &params.dialect_output, norm)?;
        for (class, files) in &layout.class_matrices {
            let Some(path) = files.get(norm) else {
                continue;
            };
            if let Some(directory) = path.parent() {
                fs::create_dir_all(directory).with_context(|| {
                    format!("Failed to create class matrix directory {}", directory.display())
                })?;
            }
            let rows = class_matrix(&forest, class);
            table::write_table(path, &params.dialect_output, Some(&header), &rows)?;
            tracing::debug!(class, norm, path = %path.display(), "Class matrix written");
        }
    }

    tracing::info!(
        classes = layout.class_matrices.len(),
        norms = state.norms.len(),
        directory = %layout.classes_matrices_directory.display(),
        "Class matrices written"
    );
    Ok(())
}
