//! One reconciliation pass.
//!
//! ```text
//! fetch → fingerprint → unchanged?  ── yes ─▶ [Unchanged]
//!                          │ no
//!                       convert → remote id known?
//!                                   │ no  ─▶ create ─▶ [Created]
//!                                   │ yes ─▶ get ── missing ─▶ create ─▶ [Created]
//!                                               └─ found ─▶ delta, update ─▶ [Updated]
//! ```
//!
//! The new fingerprint is written only after the store acknowledged the
//! create or update. A crash in between costs one redundant publish.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use specsync_core::{persistence, ArtifactId, Fingerprint, SyncConfig, SyncState};

use crate::change::has_changed;
use crate::convert::{ConvertedArtifact, Converter};
use crate::fingerprint::fingerprint_capture;
use crate::source::DocumentSource;
use crate::store::ArtifactStore;
use crate::summary::ArtifactDelta;
use crate::SyncError;

/// Terminal state of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Fingerprint matched the last published one; the store was not touched.
    Unchanged { fingerprint: Fingerprint },
    /// A new collection was published. `replaced_missing` is set when a
    /// configured id no longer existed remotely.
    Created {
        id: ArtifactId,
        replaced_missing: bool,
    },
    /// The bound collection was overwritten. `delta` is `None` when the
    /// existing collection could not be summarised.
    Updated {
        id: ArtifactId,
        delta: Option<ArtifactDelta>,
    },
}

impl PassOutcome {
    pub fn published(&self) -> bool {
        !matches!(self, PassOutcome::Unchanged { .. })
    }
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassOutcome::Unchanged { fingerprint } => {
                write!(f, "unchanged ({})", fingerprint.short())
            }
            PassOutcome::Created {
                id,
                replaced_missing: false,
            } => write!(f, "created collection {id}"),
            PassOutcome::Created {
                id,
                replaced_missing: true,
            } => write!(f, "created collection {id} (previous collection was missing)"),
            PassOutcome::Updated { id, .. } => write!(f, "updated collection {id}"),
        }
    }
}

/// Everything a pass needs, built once per run.
pub struct SyncContext {
    config: SyncConfig,
    state_dir: PathBuf,
    source: DocumentSource,
    store: Box<dyn ArtifactStore>,
    converter: Box<dyn Converter>,
}

impl SyncContext {
    pub fn new(
        config: SyncConfig,
        state_dir: impl Into<PathBuf>,
        source: DocumentSource,
        store: Box<dyn ArtifactStore>,
        converter: Box<dyn Converter>,
    ) -> Self {
        Self {
            config,
            state_dir: state_dir.into(),
            source,
            store,
            converter,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Run fetch → detect → reconcile once.
    ///
    /// Any error leaves the persisted fingerprint untouched, so the next
    /// pass starts over from the fetch.
    pub fn run_pass(&mut self) -> Result<PassOutcome, SyncError> {
        self.source.fetch()?;
        let current = fingerprint_capture(self.source.raw_capture())?;

        let persisted = persistence::load_state_at(&self.state_dir)?;
        if !has_changed(&current, persisted.as_ref()) {
            tracing::info!("no changes detected (fingerprint {})", current.short());
            return Ok(PassOutcome::Unchanged {
                fingerprint: current,
            });
        }
        tracing::info!("changes detected (fingerprint {})", current.short());

        let raw = self.source.raw_capture().ok_or(SyncError::NoCapture)?;
        let converted = self.converter.convert(raw)?;

        let outcome = self.publish(&converted)?;
        persistence::save_state_at(&self.state_dir, &SyncState::captured_now(current))?;
        tracing::info!("sync complete: {outcome}");
        Ok(outcome)
    }

    fn publish(&mut self, converted: &ConvertedArtifact) -> Result<PassOutcome, SyncError> {
        let Some(id) = self.config.remote_artifact_id.clone() else {
            return self.create(converted, false);
        };

        match self.store.get(&id)? {
            Some(existing) => {
                let delta = report_delta(&id, &existing, &converted.0);
                self.store.update(&id, &converted.0)?;
                Ok(PassOutcome::Updated { id, delta })
            }
            None => {
                tracing::warn!("collection {id} no longer exists, creating a new one");
                self.create(converted, true)
            }
        }
    }

    fn create(
        &mut self,
        converted: &ConvertedArtifact,
        replaced_missing: bool,
    ) -> Result<PassOutcome, SyncError> {
        let id = self.store.create(&converted.0)?;
        self.config.remote_artifact_id = Some(id.clone());
        persistence::save_config_at(&self.state_dir, &self.config)?;
        Ok(PassOutcome::Created {
            id,
            replaced_missing,
        })
    }
}

/// Log the old → new summary. Never fails the pass.
fn report_delta(id: &ArtifactId, existing: &Value, converted: &Value) -> Option<ArtifactDelta> {
    match ArtifactDelta::compute(id, existing, converted) {
        Ok(delta) => {
            tracing::info!("changes for collection {id}:");
            for line in delta.lines() {
                tracing::info!("  {line}");
            }
            Some(delta)
        }
        Err(err) => {
            tracing::warn!("could not summarise changes for collection {id}: {err}");
            None
        }
    }
}
