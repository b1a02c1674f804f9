//! Shared data types for the fforest experiment pipeline.
//!
//! Pure data: no file-system access lives here, so the state and engine
//! crates can share these types without circular dependencies.

#![warn(clippy::pedantic)]

pub mod dialect;
pub mod error;
pub mod method;
pub mod norm;
pub mod phase;
pub mod state;

pub use dialect::{Dialect, LineTerminator, Quoting};
pub use error::ParseEnumError;
pub use method::{
    ClusteringTreesMethod, EntropyMeasure, QualityComputingMethod, SplittingMethod, TableFormat,
    Verbosity,
};
pub use norm::{norm_name, norm_names};
pub use phase::Phase;
pub use state::{ColumnRef, ExperimentParameters, RunLayout, RunState, RunStatistics, TreeLayout};
