//! Snapshot store error types.

/// Errors produced by [`SnapshotStore`](crate::SnapshotStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// File-system I/O failure (e.g. creating the snapshot directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot was written by an incompatible version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Internal mutex was poisoned by a panicked thread.
    #[error("snapshot store lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_poisoned_displays() {
        let err = StateError::LockPoisoned;
        assert_eq!(err.to_string(), "snapshot store lock poisoned");
    }

    #[test]
    fn io_error_wraps() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StateError::Io(inner);
        assert!(err.to_string().contains("i/o"));
    }

    #[test]
    fn serialization_error_wraps() {
        let inner = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: StateError = inner.into();
        assert!(err.to_string().starts_with("snapshot serialization error"));
    }

    #[test]
    fn version_mismatch_names_both_versions() {
        let err = StateError::UnsupportedVersion {
            found: 7,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported snapshot version 7 (expected 1)"
        );
    }
}
