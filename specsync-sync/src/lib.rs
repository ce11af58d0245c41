//! # specsync-sync
//!
//! Change-gated reconciliation of one OpenAPI document against one remote
//! Postman collection.
//!
//! Build a [`SyncContext`] once per run and call [`SyncContext::run_pass`]
//! for each attempt. Every collaborator sits behind a trait
//! ([`DocumentFetch`], [`ArtifactStore`], [`Converter`]) so the pass logic
//! runs the same against HTTP clients and in-memory fakes.

pub mod change;
pub mod convert;
pub mod error;
pub mod fingerprint;
pub mod reconcile;
pub mod setup;
pub mod source;
pub mod store;
pub mod summary;

pub use change::has_changed;
pub use convert::{CommandConverter, ConvertedArtifact, Converter, HttpConverter};
pub use error::SyncError;
pub use fingerprint::fingerprint;
pub use reconcile::{PassOutcome, SyncContext};
pub use setup::{list_collections, provide_config, verify_credential, ConfigProvider};
pub use source::{DocumentFetch, DocumentSource, HttpFetch, SourceDocument};
pub use store::{ArtifactStore, CollectionSummary, PostmanClient};
pub use summary::{ArtifactDelta, RemoteArtifactSummary};
