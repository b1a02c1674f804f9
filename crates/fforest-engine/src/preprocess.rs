//! Preprocess phase: normalize the input table.
//!
//! The preprocessed table uses the output dialect, has no header, holds the
//! identifier in column 0 and the class in the last column. The input
//! header (reordered the same way) is kept in its own file.

use std::fs;

use anyhow::Context;
use fforest_types::RunState;

use crate::errors::PipelineError;
use crate::phase::{layout, parameters, parameters_mut};
use crate::table;

/// Header of the generated identifier column.
pub const GENERATED_IDENTIFIER: &str = "ID";

/// Column order of the preprocessed table, as indices into the input row.
/// `None` stands for the generated identifier.
fn column_order(width: usize, identifier: Option<usize>, class: Option<usize>) -> Vec<Option<usize>> {
    let mut order = Vec::with_capacity(width + 1);
    order.push(identifier);
    order.extend(
        (0..width)
            .filter(|index| Some(*index) != identifier && Some(*index) != class)
            .map(Some),
    );
    if let Some(class) = class {
        order.push(Some(class));
    }
    order
}

fn reorder(
    fields: &csv::StringRecord,
    order: &[Option<usize>],
    generated: &str,
) -> Result<Vec<String>, PipelineError> {
    order
        .iter()
        .map(|column| match column {
            Some(index) => table::field(fields, *index).map(str::to_string),
            None => Ok(generated.to_string()),
        })
        .collect()
}

/// Execute the preprocess phase.
///
/// # Errors
///
/// Returns I/O failures and rows too short for the configured columns.
pub fn execute(state: &mut RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;

    fs::create_dir_all(&layout.main_directory).with_context(|| {
        format!(
            "Failed to create main directory {}",
            layout.main_directory.display()
        )
    })?;

    let input = table::read_table(&params.database, &params.dialect_input, params.have_header)?;
    let order = column_order(input.width(), params.identifier, params.class_column);

    let mut rows = Vec::with_capacity(input.rows.len());
    for (index, row) in input.rows.iter().enumerate() {
        rows.push(reorder(row, &order, &index.to_string())?);
    }
    table::write_table(
        &layout.preprocessed_table,
        &params.dialect_output,
        None,
        &rows,
    )?;

    if let Some(header) = &input.header {
        let header = reorder(header, &order, GENERATED_IDENTIFIER)?;
        table::write_table(&layout.header_file, &params.dialect_output, None, [header])?;
    }

    tracing::info!(
        input = %params.database.display(),
        output = %layout.preprocessed_table.display(),
        rows = rows.len(),
        generated_identifier = params.identifier.is_none(),
        "Table preprocessed"
    );

    let row_count = rows.len();
    let class_column = params.class_column.map(|_| order.len() - 1);
    parameters_mut(state)?.preprocessed_class_column = class_column;
    state.statistics.original_rows = Some(row_count);
    Ok(())
}
