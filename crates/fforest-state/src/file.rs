//! JSON-file implementation of [`SnapshotStore`].
//!
//! The snapshot is a single pretty-printed JSON document. Writes go to a
//! sibling temporary file which is then renamed over the previous snapshot,
//! so an interrupted save never leaves a truncated file behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fforest_types::RunState;
use serde::{Deserialize, Serialize};

use crate::backend::SnapshotStore;
use crate::error::{self, StateError};

/// File name of the snapshot inside the run's main directory.
pub const SNAPSHOT_FILE_NAME: &str = "environment.json";

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    state: &'a RunState,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    state: RunState,
}

/// Snapshot stored as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    /// Store writing to an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store writing [`SNAPSHOT_FILE_NAME`] inside `directory`.
    #[must_use]
    pub fn in_directory(directory: &Path) -> Self {
        Self::new(directory.join(SNAPSHOT_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn save(&self, state: &RunState) -> error::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let envelope = EnvelopeRef {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            state,
        };
        let body = serde_json::to_vec_pretty(&envelope)?;
        let temp = self.temp_path();
        fs::write(&temp, body)?;
        fs::rename(&temp, &self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            phase = %state.current_phase,
            "Snapshot saved"
        );
        Ok(())
    }

    fn load(&self) -> error::Result<Option<RunState>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope = serde_json::from_slice(&raw)?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: envelope.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(Some(envelope.state))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
