//! Split phases: original → {train, test}, train → {reference, subtrain},
//! subtrain → one subsubtrain table per tree.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use fforest_types::RunState;

use crate::errors::PipelineError;
use crate::partition::{split_table, RowLimit, SplitRequest};
use crate::phase::{layout, parameters};
use crate::table;

/// Execute the initial split.
///
/// # Errors
///
/// Returns partitioning errors and I/O failures.
pub fn initial(state: &mut RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;
    let outputs = [layout.train_table.clone(), layout.test_table.clone()];

    let counts = split_table(&SplitRequest {
        input: &layout.preprocessed_table,
        outputs: &outputs,
        dialect: &params.dialect_output,
        have_header: false,
        method: params.initial_split_method,
        class_column: params.preprocessed_class_column,
        row_limit: RowLimit::parse(&params.training_value)?,
    })?;

    tracing::info!(
        method = %params.initial_split_method,
        train_rows = counts[0],
        test_rows = counts[1],
        "Initial split done"
    );
    state.statistics.train_rows = Some(counts[0]);
    state.statistics.test_rows = Some(counts[1]);
    Ok(())
}

/// Execute the reference split. The reference table receives the row limit.
///
/// # Errors
///
/// Returns partitioning errors and I/O failures.
pub fn reference(state: &mut RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;
    fs::create_dir_all(&layout.subtrain_directory).with_context(|| {
        format!(
            "Failed to create subtrain directory {}",
            layout.subtrain_directory.display()
        )
    })?;
    let outputs = [layout.reference_table.clone(), layout.subtrain_table.clone()];

    let counts = split_table(&SplitRequest {
        input: &layout.train_table,
        outputs: &outputs,
        dialect: &params.dialect_output,
        have_header: false,
        method: params.reference_split_method,
        class_column: params.preprocessed_class_column,
        row_limit: RowLimit::parse(&params.reference_value)?,
    })?;

    tracing::info!(
        method = %params.reference_split_method,
        reference_rows = counts[0],
        subtrain_rows = counts[1],
        "Reference split done"
    );
    state.statistics.reference_rows = Some(counts[0]);
    state.statistics.subtrain_rows = Some(counts[1]);
    Ok(())
}

/// Execute the subsubtrain split: each tree receives
/// `subtrain_rows / trees` rows (per class, proportionally, when
/// stratified), the last tree the remainder.
///
/// # Errors
///
/// Returns partitioning errors and I/O failures.
pub fn subsubtrain(state: &mut RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;

    for tree in &layout.trees {
        fs::create_dir_all(&tree.directory).with_context(|| {
            format!("Failed to create tree directory {}", tree.directory.display())
        })?;
    }

    let subtrain_rows = table::count_rows(&layout.subtrain_table, &params.dialect_output, false)?;
    let trees = usize::try_from(params.trees_in_forest.max(1)).unwrap_or(usize::MAX);
    let outputs: Vec<PathBuf> = layout.trees.iter().map(|tree| tree.table.clone()).collect();

    let counts = split_table(&SplitRequest {
        input: &layout.subtrain_table,
        outputs: &outputs,
        dialect: &params.dialect_output,
        have_header: false,
        method: params.subsubtrain_split_method,
        class_column: params.preprocessed_class_column,
        row_limit: RowLimit::Rows(subtrain_rows / trees),
    })?;

    for (tree, rows) in layout.trees.iter().zip(&counts) {
        tracing::debug!(tree = tree.name, rows, "Subsubtrain table written");
    }
    tracing::info!(
        method = %params.subsubtrain_split_method,
        trees = counts.len(),
        rows_per_tree = subtrain_rows / trees,
        "Subsubtrain split done"
    );

    let per_tree = layout
        .trees
        .iter()
        .map(|tree| tree.name.clone())
        .zip(counts)
        .collect();
    state.statistics.subsubtrain_rows = per_tree;
    Ok(())
}
