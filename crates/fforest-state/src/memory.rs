//! In-memory implementation of [`SnapshotStore`], for tests.

use std::sync::{Mutex, MutexGuard};

use fforest_types::RunState;

use crate::backend::SnapshotStore;
use crate::error::{self, StateError};

/// Keeps every saved snapshot in memory.
///
/// The history is retained so tests can assert which phases were persisted.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    history: Mutex<Vec<RunState>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an existing snapshot.
    #[must_use]
    pub fn with_snapshot(state: RunState) -> Self {
        Self {
            history: Mutex::new(vec![state]),
        }
    }

    fn lock(&self) -> error::Result<MutexGuard<'_, Vec<RunState>>> {
        self.history.lock().map_err(|_| StateError::LockPoisoned)
    }

    /// Every snapshot saved so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::LockPoisoned`] if a writer panicked.
    pub fn history(&self) -> error::Result<Vec<RunState>> {
        Ok(self.lock()?.clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, state: &RunState) -> error::Result<()> {
        self.lock()?.push(state.clone());
        Ok(())
    }

    fn load(&self) -> error::Result<Option<RunState>> {
        Ok(self.lock()?.last().cloned())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
