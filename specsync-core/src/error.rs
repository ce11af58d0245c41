//! Error types for specsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Rejections raised while validating a [`crate::SyncConfig`].
///
/// All of these fire before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("source URL is required")]
    MissingSourceUrl,

    #[error("invalid source URL '{url}': {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("store credential is required")]
    MissingCredential,

    #[error("poll interval {got}s is below the minimum of {floor}s")]
    IntervalBelowFloor { got: u64, floor: u64 },
}

/// Errors from reading or writing the local durable records.
#[derive(Debug, Error)]
pub enum StateError {
    /// I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path only; bad JSON on load is absence).
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The process working directory could not be resolved.
    #[error("cannot determine working directory: {0}")]
    WorkingDirNotFound(#[source] std::io::Error),
}

/// Convenience constructor for [`StateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}
