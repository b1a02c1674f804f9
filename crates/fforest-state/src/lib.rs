//! Run-state persistence for the fforest pipeline.
//!
//! Provides the [`SnapshotStore`] trait, a [`JsonFileSnapshotStore`] that
//! writes the environment snapshot next to the run artifacts, and a
//! [`MemorySnapshotStore`] for tests.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;

pub use backend::SnapshotStore;
pub use error::StateError;
pub use file::{JsonFileSnapshotStore, SNAPSHOT_FILE_NAME};
pub use memory::MemorySnapshotStore;
