//! Delimited-table I/O driven by a [`Dialect`].
//!
//! Tables are small enough to be held in memory: every stage reads its input
//! table whole, transforms the rows and writes the outputs.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use fforest_types::{ColumnRef, Dialect, LineTerminator, Quoting};

use crate::errors::PipelineError;

/// Rows of a table plus its optional header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Option<StringRecord>,
    pub rows: Vec<StringRecord>,
}

impl Table {
    /// Number of columns, taken from the header or the first row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.header
            .as_ref()
            .or_else(|| self.rows.first())
            .map_or(0, StringRecord::len)
    }
}

fn ascii_byte(value: char, what: &str) -> Result<u8> {
    u8::try_from(value)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("{what} '{value}' is not a single ASCII character"))
}

/// CSV reader configured for `dialect`. Headers are never consumed by the
/// reader itself; [`read_table`] splits them off.
///
/// # Errors
///
/// Returns an error if the delimiter or quote character is not ASCII.
pub fn reader_builder(dialect: &Dialect) -> Result<ReaderBuilder> {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(ascii_byte(dialect.delimiter, "delimiter")?)
        .quote(ascii_byte(dialect.quote_char, "quote character")?)
        .quoting(dialect.quoting != Quoting::None)
        .terminator(match dialect.line_terminator {
            LineTerminator::Auto | LineTerminator::CrLf => Terminator::CRLF,
            LineTerminator::Lf => Terminator::Any(b'\n'),
            LineTerminator::Cr => Terminator::Any(b'\r'),
        });
    if dialect.skip_initial_space {
        builder.trim(Trim::Fields);
    }
    Ok(builder)
}

/// CSV writer configured for `dialect`.
///
/// # Errors
///
/// Returns an error if the delimiter or quote character is not ASCII.
pub fn writer_builder(dialect: &Dialect) -> Result<WriterBuilder> {
    let mut builder = WriterBuilder::new();
    builder
        .has_headers(false)
        .delimiter(ascii_byte(dialect.delimiter, "delimiter")?)
        .quote(ascii_byte(dialect.quote_char, "quote character")?)
        .quote_style(match dialect.quoting {
            Quoting::All => QuoteStyle::Always,
            Quoting::Minimal => QuoteStyle::Necessary,
            Quoting::NonNumeric => QuoteStyle::NonNumeric,
            Quoting::None => QuoteStyle::Never,
        })
        .terminator(match dialect.line_terminator {
            LineTerminator::Auto | LineTerminator::Lf => Terminator::Any(b'\n'),
            LineTerminator::Cr => Terminator::Any(b'\r'),
            LineTerminator::CrLf => Terminator::CRLF,
        });
    Ok(builder)
}

/// Read a whole table, splitting off the first row as header when
/// `have_header` is set.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row cannot be parsed.
pub fn read_table(path: &Path, dialect: &Dialect, have_header: bool) -> Result<Table> {
    let mut reader = reader_builder(dialect)?
        .from_path(path)
        .with_context(|| format!("Failed to open table {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read row {} of {}", index + 1, path.display()))?;
        rows.push(record);
    }

    let header = if have_header && !rows.is_empty() {
        Some(rows.remove(0))
    } else {
        None
    };
    Ok(Table { header, rows })
}

/// Write `rows` (after `header`, when given) to `path`, replacing any
/// existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_table<R, I, F>(
    path: &Path,
    dialect: &Dialect,
    header: Option<&StringRecord>,
    rows: R,
) -> Result<usize>
where
    R: IntoIterator<Item = I>,
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create table {}", path.display()))?;
    let mut writer = writer_builder(dialect)?.from_writer(file);

    if let Some(header) = header {
        writer
            .write_record(header)
            .with_context(|| format!("Failed to write header of {}", path.display()))?;
    }
    let mut written = 0usize;
    for row in rows {
        writer
            .write_record(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
        written += 1;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(written)
}

/// Number of data rows of a table (header excluded).
///
/// # Errors
///
/// Returns an error if the table cannot be read.
pub fn count_rows(path: &Path, dialect: &Dialect, have_header: bool) -> Result<usize> {
    let mut reader = reader_builder(dialect)?
        .from_path(path)
        .with_context(|| format!("Failed to open table {}", path.display()))?;
    let mut record = StringRecord::new();
    let mut rows = 0usize;
    while reader
        .read_record(&mut record)
        .with_context(|| format!("Failed to read {}", path.display()))?
    {
        rows += 1;
    }
    Ok(if have_header { rows.saturating_sub(1) } else { rows })
}

/// Resolve a column reference to a zero-based index.
///
/// Negative indices count from the end; names are looked up in `header`.
///
/// # Errors
///
/// Returns [`PipelineError::ColumnOutOfBounds`], [`PipelineError::UnknownColumn`]
/// or [`PipelineError::ColumnNameWithoutHeader`].
pub fn resolve_column(
    column: &ColumnRef,
    header: Option<&StringRecord>,
    columns: usize,
) -> Result<usize, PipelineError> {
    match column {
        ColumnRef::Index(index) => {
            let width = i64::try_from(columns).unwrap_or(i64::MAX);
            let absolute = if *index < 0 { width + index } else { *index };
            if (0..width).contains(&absolute) {
                usize::try_from(absolute).map_err(|_| PipelineError::ColumnOutOfBounds {
                    index: *index,
                    columns,
                })
            } else {
                Err(PipelineError::ColumnOutOfBounds {
                    index: *index,
                    columns,
                })
            }
        }
        ColumnRef::Name(name) => {
            let header = header.ok_or_else(|| PipelineError::ColumnNameWithoutHeader {
                name: name.clone(),
            })?;
            header
                .iter()
                .position(|field| field.trim() == name.trim())
                .ok_or_else(|| PipelineError::UnknownColumn { name: name.clone() })
        }
    }
}

/// Field `index` of `record`, or an error naming the offending row.
///
/// # Errors
///
/// Returns [`PipelineError::ColumnOutOfBounds`] when the row is too short.
pub fn field(record: &StringRecord, index: usize) -> Result<&str, PipelineError> {
    record
        .get(index)
        .ok_or_else(|| PipelineError::ColumnOutOfBounds {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            columns: record.len(),
        })
}
