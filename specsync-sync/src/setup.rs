//! Setup: turn provider answers into a saved, credential-checked config.
//!
//! The provider only gathers answers (prompts, flags, a test script).
//! Ordering is fixed here: validate locally, probe the credential, let the
//! provider pick a collection, save.

use std::path::Path;

use specsync_core::{persistence, ArtifactId, ConfigAnswers, StoreCredential, SyncConfig};

use crate::store::{ArtifactStore, CollectionSummary};
use crate::SyncError;

/// Source of configuration answers.
pub trait ConfigProvider {
    type Error: From<SyncError>;

    /// Offered when a saved config exists. `true` skips [`Self::answers`].
    fn reuse_existing(&mut self, existing: &SyncConfig) -> Result<bool, Self::Error>;

    fn answers(&mut self, existing: Option<&SyncConfig>) -> Result<ConfigAnswers, Self::Error>;

    /// Called after the credential probe succeeded, only when the answers
    /// did not pin a collection. `None` means "create a new one on the
    /// first publish".
    fn choose_collection(
        &mut self,
        _store: &dyn ArtifactStore,
        current: Option<&ArtifactId>,
    ) -> Result<Option<ArtifactId>, Self::Error> {
        Ok(current.cloned())
    }
}

/// Fail with [`SyncError::InvalidCredential`] unless the store accepts the
/// credential.
pub fn verify_credential(store: &dyn ArtifactStore) -> Result<(), SyncError> {
    if store.validate_credential()? {
        tracing::info!("credential accepted");
        Ok(())
    } else {
        Err(SyncError::InvalidCredential)
    }
}

/// Collections on offer for [`ConfigProvider::choose_collection`].
///
/// `None` when listing failed after the credential was accepted; the
/// failure is logged and setup carries on with the current binding.
pub fn list_collections(store: &dyn ArtifactStore) -> Option<Vec<CollectionSummary>> {
    match store.list() {
        Ok(collections) => Some(collections),
        Err(err) => {
            tracing::warn!("could not fetch collections, a new one will be created: {err}");
            None
        }
    }
}

/// Run the setup sequence against the records in `state_dir`.
///
/// `connect` builds a store client for a credential; the returned store is
/// the one that passed the probe.
pub fn provide_config<P, F>(
    provider: &mut P,
    state_dir: &Path,
    connect: F,
) -> Result<(SyncConfig, Box<dyn ArtifactStore>), P::Error>
where
    P: ConfigProvider,
    F: Fn(&StoreCredential) -> Box<dyn ArtifactStore>,
{
    let existing = persistence::load_config_at(state_dir).map_err(SyncError::from)?;

    if let Some(config) = existing.as_ref() {
        if provider.reuse_existing(config)? {
            tracing::info!("using saved configuration for {}", config.source_url);
            let store = connect(&config.store_credential);
            verify_credential(store.as_ref())?;
            return Ok((config.clone(), store));
        }
    }

    let answers = provider.answers(existing.as_ref())?;
    let pinned = answers.remote_artifact_id.is_some();
    let mut config = SyncConfig::resolve(existing.as_ref(), answers).map_err(SyncError::from)?;

    let store = connect(&config.store_credential);
    verify_credential(store.as_ref())?;

    if !pinned {
        config.remote_artifact_id =
            provider.choose_collection(store.as_ref(), config.remote_artifact_id.as_ref())?;
    }

    persistence::save_config_at(state_dir, &config).map_err(SyncError::from)?;
    tracing::info!("configuration saved to {}", persistence::config_path_at(state_dir).display());
    Ok((config, store))
}
