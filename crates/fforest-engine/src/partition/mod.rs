//! Partitioning engine: cut one table into several.
//!
//! Partitioning is a pure function of the rows; [`split_table`] wraps it
//! with table I/O so the header (when present) is written once per output.

mod sequential;
mod stratified;

use std::path::{Path, PathBuf};

use csv::StringRecord;
use fforest_types::{Dialect, SplittingMethod};

use crate::errors::PipelineError;
use crate::table;

pub use sequential::SequentialCut;
pub use stratified::StratifiedCut;

// ---------------------------------------------------------------------------
// Row limits
// ---------------------------------------------------------------------------

/// Number of rows given to each output but the last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowLimit {
    /// Fraction of the input rows, in `[0, 1]`.
    Fraction(f64),
    /// Absolute row count.
    Rows(usize),
}

impl RowLimit {
    /// Parse a user-supplied row limit.
    ///
    /// Only decimal fractions in `[0, 1]` written with a decimal point are
    /// accepted; a bare integer such as `500` is ambiguous and rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRowLimit`] for anything else.
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        let trimmed = value.trim();
        let invalid = || PipelineError::InvalidRowLimit {
            value: value.to_string(),
        };
        if !trimmed.contains('.') {
            return Err(invalid());
        }
        let fraction: f64 = trimmed.parse().map_err(|_| invalid())?;
        if (0.0..=1.0).contains(&fraction) {
            Ok(Self::Fraction(fraction))
        } else {
            Err(invalid())
        }
    }

    /// Absolute row count for a table of `total_rows` rows.
    ///
    /// Fractions are rounded half to even.
    #[must_use]
    pub fn resolve(self, total_rows: usize) -> usize {
        match self {
            Self::Rows(rows) => rows,
            Self::Fraction(fraction) => round_to_count(fraction * as_f64(total_rows)),
        }
    }
}

/// Convert a user-supplied row limit to an absolute row count.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRowLimit`] when `spec` is not a fraction.
pub fn convert_row_limit(spec: &str, total_rows: usize) -> Result<usize, PipelineError> {
    Ok(RowLimit::parse(spec)?.resolve(total_rows))
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64(value: usize) -> f64 {
    value as f64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn round_to_count(value: f64) -> usize {
    value.round_ties_even().max(0.0) as usize
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A strategy that distributes rows over `outputs` tables.
pub trait Partitioner: Send + Sync {
    /// Split `rows` so that each output but the last receives `row_limit`
    /// rows (per class, proportionally, for stratified strategies) and the
    /// last receives the remainder.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the rows cannot be distributed.
    fn split(
        &self,
        rows: Vec<StringRecord>,
        row_limit: usize,
        outputs: usize,
    ) -> Result<Vec<Vec<StringRecord>>, PipelineError>;
}

/// Partitioner implementing `method`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingClassificationAttribute`] when the
/// stratified method is requested without a class column.
pub fn partitioner(
    method: SplittingMethod,
    class_column: Option<usize>,
) -> Result<Box<dyn Partitioner>, PipelineError> {
    match method {
        SplittingMethod::Sequential => Ok(Box::new(SequentialCut)),
        SplittingMethod::Stratified => class_column
            .map(|class_column| Box::new(StratifiedCut { class_column }) as Box<dyn Partitioner>)
            .ok_or_else(|| PipelineError::MissingClassificationAttribute {
                needed_by: format!("splitting method '{method}'"),
            }),
    }
}

// ---------------------------------------------------------------------------
// Table wrapper
// ---------------------------------------------------------------------------

/// Description of one split: input table, outputs and cut parameters.
#[derive(Debug, Clone)]
pub struct SplitRequest<'a> {
    pub input: &'a Path,
    pub outputs: &'a [PathBuf],
    pub dialect: &'a Dialect,
    pub have_header: bool,
    pub method: SplittingMethod,
    pub class_column: Option<usize>,
    pub row_limit: RowLimit,
}

/// Split a table file into `request.outputs.len()` files.
///
/// Returns the number of data rows written to each output.
///
/// # Errors
///
/// Returns partitioning errors and I/O failures.
pub fn split_table(request: &SplitRequest<'_>) -> Result<Vec<usize>, PipelineError> {
    if request.outputs.is_empty() {
        return Err(PipelineError::infrastructure(format!(
            "split of {} requested with no output table",
            request.input.display()
        )));
    }
    let strategy = partitioner(request.method, request.class_column)?;
    let table = table::read_table(request.input, request.dialect, request.have_header)?;
    let row_limit = request.row_limit.resolve(table.rows.len());

    tracing::debug!(
        input = %request.input.display(),
        method = %request.method,
        rows = table.rows.len(),
        row_limit,
        outputs = request.outputs.len(),
        "Splitting table"
    );

    let parts = strategy.split(table.rows, row_limit, request.outputs.len())?;
    let mut counts = Vec::with_capacity(parts.len());
    for (path, rows) in request.outputs.iter().zip(&parts) {
        counts.push(table::write_table(
            path,
            request.dialect,
            table.header.as_ref(),
            rows,
        )?);
    }
    Ok(counts)
}
