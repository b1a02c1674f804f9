//! Pipeline error model.

use std::path::PathBuf;

use fforest_state::StateError;
use fforest_types::Phase;

/// Categorized pipeline error.
///
/// Configuration and resume errors are raised before any stage touches the
/// run state, so they abort without writing a snapshot. Everything else is
/// raised from inside a stage and triggers a best-effort snapshot first.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Every problem found while validating the experiment configuration.
    #[error("experiment configuration is invalid:\n  - {}", .0.join("\n  - "))]
    Config(Vec<String>),

    #[error("invalid row limit '{value}': expected a decimal fraction between 0 and 1 (e.g. 0.8)")]
    InvalidRowLimit { value: String },

    #[error("column index {index} is out of bounds for a table with {columns} columns")]
    ColumnOutOfBounds { index: i64, columns: usize },

    #[error("unknown column '{name}'")]
    UnknownColumn { name: String },

    #[error("column '{name}' is referenced by name but the table has no header")]
    ColumnNameWithoutHeader { name: String },

    #[error("{needed_by} requires a class column")]
    MissingClassificationAttribute { needed_by: String },

    #[error(
        "cannot split class '{class}' into {outputs} tables: {rows_to_give} rows per table \
         are needed but the class only has {available}"
    )]
    TooManyPartitionsToSplit {
        class: String,
        outputs: usize,
        rows_to_give: usize,
        available: usize,
    },

    #[error("cannot resume at phase '{requested}': {}", last_completed_message(.last_completed))]
    UnprocessablePhase {
        requested: Phase,
        last_completed: Option<Phase>,
    },

    #[error("tree builder failed for {tree}: {reason}")]
    TreeBuilder { tree: String, reason: String },

    #[error("malformed tree builder output for {tree}: {reason}")]
    MalformedTreeOutput { tree: String, reason: String },

    #[error("missing artifact {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] StateError),

    /// Infrastructure error (file system, CSV encoding, process spawning, etc.)
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

fn last_completed_message(last: &Option<Phase>) -> String {
    match last {
        Some(phase) => format!("the last completed phase is '{phase}'"),
        None => "no phase has been completed yet".to_string(),
    }
}

impl PipelineError {
    /// Whether the driver must stop without writing the best-effort snapshot.
    #[must_use]
    pub fn aborts_without_snapshot(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::InvalidRowLimit { .. }
                | Self::ColumnOutOfBounds { .. }
                | Self::UnknownColumn { .. }
                | Self::ColumnNameWithoutHeader { .. }
                | Self::MissingClassificationAttribute { .. }
                | Self::UnprocessablePhase { .. }
        )
    }

    pub(crate) fn infrastructure(message: impl std::fmt::Display) -> Self {
        Self::Infrastructure(anyhow::anyhow!("{message}"))
    }
}
