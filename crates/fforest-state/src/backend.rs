//! Snapshot store trait definition.
//!
//! [`SnapshotStore`] defines where the run state lives between phases.
//! The state model itself is [`fforest_types::RunState`].

use fforest_types::RunState;

use crate::error;

/// Storage contract for run-state snapshots.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn SnapshotStore>`.
pub trait SnapshotStore: Send + Sync {
    /// Persist `state`, replacing any previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn save(&self, state: &RunState) -> error::Result<()>;

    /// Read the last persisted snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure
    /// or when the snapshot cannot be decoded.
    fn load(&self) -> error::Result<Option<RunState>>;

    /// Human-readable location of the snapshot, for log messages.
    fn location(&self) -> String;
}
