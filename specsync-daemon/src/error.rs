use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the scheduler and its runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sync(#[from] specsync_sync::SyncError),

    /// A pass panicked or was cancelled by the runtime.
    #[error("pass task join failure: {0}")]
    Join(String),

    #[error("signal handler failed: {0}")]
    Signal(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
