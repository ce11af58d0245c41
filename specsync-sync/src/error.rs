//! Error types for specsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use specsync_core::{ConfigError, StateError};

/// All errors that can arise below the scheduler boundary.
///
/// Everything except [`SyncError::InvalidConfig`] and
/// [`SyncError::InvalidCredential`] is scoped to a single pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration rejected before any network activity.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The store rejected the identity probe.
    #[error("the artifact store rejected the credential")]
    InvalidCredential,

    /// Transport failure or non-2xx status while fetching the source document.
    #[error("failed to fetch source document from {url}: {message}")]
    Fetch { url: String, message: String },

    /// The fetched body is not an OpenAPI/Swagger document.
    #[error("invalid source document: {0}")]
    InvalidDocument(String),

    /// Fingerprinting was requested before any document was captured.
    #[error("no data to fingerprint")]
    NoCapture,

    /// The conversion service reported failure or could not be reached.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Artifact store call failed; `status` is absent for transport errors.
    #[error("{operation} failed{}: {message}", status_suffix(.status))]
    Store {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// An item tree nested deeper than the walk allows.
    #[error("collection item tree exceeds depth limit of {limit}")]
    TooDeep { limit: usize },

    /// An error from the local durable records.
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}
