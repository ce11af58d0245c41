//! specsync core library — domain types, config validation, local records.
//!
//! Public API surface:
//! - [`types`] — newtypes and the persisted records
//! - [`config`] — pure config resolution and validation
//! - [`error`] — [`ConfigError`], [`StateError`]
//! - [`persistence`] — load / save of the two local durable records

pub mod config;
pub mod error;
pub mod persistence;
pub mod types;

pub use config::{ConfigAnswers, DEFAULT_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS};
pub use error::{ConfigError, StateError};
pub use types::{ArtifactId, Fingerprint, StoreCredential, SyncConfig, SyncState};
