//! Pure config resolution.
//!
//! A configuration provider (interactive prompts, CLI flags, a test) only
//! gathers [`ConfigAnswers`]; turning them into a [`SyncConfig`] happens
//! here, without I/O.

use url::Url;

use crate::error::ConfigError;
use crate::types::{ArtifactId, StoreCredential, SyncConfig};

/// Lowest accepted polling period.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

/// Polling period used when neither the answers nor the existing config set one.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Raw answers from a configuration provider. `None` means "keep existing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigAnswers {
    pub source_url: Option<String>,
    pub store_credential: Option<String>,
    pub remote_artifact_id: Option<String>,
    pub poll_interval_seconds: Option<u64>,
}

impl SyncConfig {
    /// Build and validate a config from explicit values.
    pub fn new(
        source_url: impl Into<String>,
        store_credential: StoreCredential,
        remote_artifact_id: Option<ArtifactId>,
        poll_interval_seconds: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            source_url: source_url.into().trim().to_string(),
            store_credential,
            remote_artifact_id,
            poll_interval_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Merge `answers` over `existing` field by field and validate the result.
    ///
    /// An empty artifact id answer clears the binding (the next pass creates
    /// a new collection).
    pub fn resolve(
        existing: Option<&SyncConfig>,
        answers: ConfigAnswers,
    ) -> Result<Self, ConfigError> {
        let source_url = answers
            .source_url
            .or_else(|| existing.map(|c| c.source_url.clone()))
            .ok_or(ConfigError::MissingSourceUrl)?;

        let store_credential = answers
            .store_credential
            .map(StoreCredential::new)
            .or_else(|| existing.map(|c| c.store_credential.clone()))
            .ok_or(ConfigError::MissingCredential)?;

        let remote_artifact_id = match answers.remote_artifact_id {
            Some(id) if id.trim().is_empty() => None,
            Some(id) => Some(ArtifactId::from(id.trim())),
            None => existing.and_then(|c| c.remote_artifact_id.clone()),
        };

        let poll_interval_seconds = answers
            .poll_interval_seconds
            .or_else(|| existing.map(|c| c.poll_interval_seconds))
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        Self::new(
            source_url,
            store_credential,
            remote_artifact_id,
            poll_interval_seconds,
        )
    }

    /// Check every invariant of a config, e.g. after loading it from disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_source_url(&self.source_url)?;
        if self.store_credential.is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        validate_poll_interval(self.poll_interval_seconds)
    }
}

/// Reject anything that is not an absolute `http`/`https` URL.
pub fn validate_source_url(raw: &str) -> Result<(), ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingSourceUrl);
    }
    let parsed = Url::parse(trimmed).map_err(|err| ConfigError::InvalidSourceUrl {
        url: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidSourceUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

pub fn validate_poll_interval(seconds: u64) -> Result<(), ConfigError> {
    if seconds < MIN_POLL_INTERVAL_SECS {
        return Err(ConfigError::IntervalBelowFloor {
            got: seconds,
            floor: MIN_POLL_INTERVAL_SECS,
        });
    }
    Ok(())
}
