//! Per-tree artifacts: classification vectors and membership tables.

use std::path::Path;

use csv::StringRecord;
use fforest_types::Dialect;

use super::parser::MembershipTable;
use crate::errors::PipelineError;
use crate::table;

/// Header of the identifier column in membership tables.
pub const KEY_ID: &str = "ID";
/// Header of the true class column in membership tables.
pub const KEY_TRUE_CLASS: &str = "trueclass";

/// Render a float the way every artifact stores it (`1.0`, `0.25`).
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// Write the headerless `id,1.0|0.0` vector of `norm`.
///
/// # Errors
///
/// Returns I/O failures.
pub fn write_classification_vector(
    path: &Path,
    dialect: &Dialect,
    table: &MembershipTable,
    norm: &str,
) -> Result<usize, PipelineError> {
    let rows = table.instances().iter().map(|instance| {
        let classified = if instance.is_correctly_classified(norm) {
            1.0
        } else {
            0.0
        };
        [instance.id.clone(), format_float(classified)]
    });
    Ok(table::write_table(path, dialect, None, rows)?)
}

/// Write the membership table of `norm`: one column per possible class,
/// classes the tree did not report holding `0.0`.
///
/// # Errors
///
/// Returns I/O failures.
pub fn write_membership_table(
    path: &Path,
    dialect: &Dialect,
    table: &MembershipTable,
    norm: &str,
    classes: &[String],
) -> Result<usize, PipelineError> {
    let mut header = StringRecord::from(vec![KEY_ID, KEY_TRUE_CLASS]);
    for class in classes {
        header.push_field(class);
    }

    let rows = table.instances().iter().map(|instance| {
        let mut row = vec![instance.id.clone(), instance.true_class.clone()];
        row.extend(
            classes
                .iter()
                .map(|class| format_float(instance.degree(norm, class).unwrap_or(0.0))),
        );
        row
    });
    Ok(table::write_table(path, dialect, Some(&header), rows)?)
}

/// One row of a membership table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRow {
    pub id: String,
    pub true_class: String,
    /// Degrees in the column order of [`StoredMembershipTable::classes`].
    pub degrees: Vec<f64>,
}

/// A membership table read back from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredMembershipTable {
    pub classes: Vec<String>,
    pub rows: Vec<MembershipRow>,
}

impl StoredMembershipTable {
    /// Degree the tree gave `class` for `row`; `0.0` for an unknown class.
    #[must_use]
    pub fn degree(&self, row: &MembershipRow, class: &str) -> f64 {
        self.classes
            .iter()
            .position(|known| known == class)
            .and_then(|column| row.degrees.get(column).copied())
            .unwrap_or(0.0)
    }

    /// Degree of every row's own true class, in row order.
    #[must_use]
    pub fn true_class_degrees(&self) -> Vec<(String, f64)> {
        self.rows
            .iter()
            .map(|row| (row.id.clone(), self.degree(row, &row.true_class)))
            .collect()
    }
}

/// Read a membership table written by [`write_membership_table`].
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] when the file does not exist,
/// and I/O or format failures otherwise.
pub fn read_membership_table(
    path: &Path,
    dialect: &Dialect,
) -> Result<StoredMembershipTable, PipelineError> {
    ensure_exists(path)?;
    let stored = table::read_table(path, dialect, true)?;
    let classes: Vec<String> = stored
        .header
        .as_ref()
        .map(|header| header.iter().skip(2).map(str::to_string).collect())
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(stored.rows.len());
    for record in &stored.rows {
        let id = table::field(record, 0)?.to_string();
        let true_class = table::field(record, 1)?.to_string();
        let degrees = record
            .iter()
            .skip(2)
            .map(|value| parse_float(value, path))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(MembershipRow {
            id,
            true_class,
            degrees,
        });
    }
    Ok(StoredMembershipTable { classes, rows })
}

/// Read a headerless `id,value` vector.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] when the file does not exist,
/// and I/O or format failures otherwise.
pub fn read_vector(path: &Path, dialect: &Dialect) -> Result<Vec<(String, f64)>, PipelineError> {
    ensure_exists(path)?;
    let stored = table::read_table(path, dialect, false)?;
    stored
        .rows
        .iter()
        .map(|record| {
            let id = table::field(record, 0)?.to_string();
            let value = parse_float(table::field(record, 1)?, path)?;
            Ok((id, value))
        })
        .collect()
}

pub(crate) fn ensure_exists(path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact {
            path: path.to_path_buf(),
        })
    }
}

fn parse_float(value: &str, path: &Path) -> Result<f64, PipelineError> {
    value.trim().parse().map_err(|_| {
        PipelineError::infrastructure(format!(
            "invalid number '{value}' in {}",
            path.display()
        ))
    })
}
