//! Domain types for specsync.
//!
//! Both persisted records ([`SyncConfig`], [`SyncState`]) are serde-friendly
//! and written as JSON by [`crate::persistence`].

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Store-assigned identifier of a published collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ArtifactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque API key for the artifact store.
///
/// `Debug` never prints the secret; use [`StoreCredential::expose`] at the
/// single point where it goes on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreCredential(String);

impl StoreCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Last four characters, for status output.
    pub fn masked(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if self.0.chars().count() <= 4 {
            "****".to_string()
        } else {
            format!("****{tail}")
        }
    }
}

impl fmt::Debug for StoreCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreCredential(<redacted>)")
    }
}

/// Hex-encoded SHA-256 content hash of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// The document-to-collection binding for one run.
///
/// Construct through [`SyncConfig::resolve`] or [`SyncConfig::new`] so the
/// interval floor and URL checks always run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source_url: String,
    pub store_credential: StoreCredential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_artifact_id: Option<ArtifactId>,
    pub poll_interval_seconds: u64,
}

/// Last fingerprint that was successfully published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub fingerprint: Fingerprint,
    pub captured_at_epoch_millis: i64,
}

impl SyncState {
    /// State stamped with the current wall-clock time.
    pub fn captured_now(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            captured_at_epoch_millis: Utc::now().timestamp_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ArtifactId::from("123-abc").to_string(), "123-abc");
        assert_eq!(Fingerprint::from("deadbeef").to_string(), "deadbeef");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = StoreCredential::new("PMAK-supersecret");
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("supersecret"));
        assert_eq!(cred.masked(), "****cret");
        assert_eq!(StoreCredential::new("abc").masked(), "****");
    }

    #[test]
    fn fingerprint_short_prefix() {
        let fp = Fingerprint::from("0123456789abcdef0123");
        assert_eq!(fp.short(), "0123456789ab");
        assert_eq!(Fingerprint::from("abc").short(), "abc");
    }

    #[test]
    fn config_serializes_without_missing_artifact_id() {
        let config = SyncConfig {
            source_url: "https://api.example.com/openapi.json".to_string(),
            store_credential: StoreCredential::new("key"),
            remote_artifact_id: None,
            poll_interval_seconds: 300,
        };
        let json = serde_json::to_value(&config).expect("serialize");
        assert!(json.get("remote_artifact_id").is_none());
        assert_eq!(json["store_credential"], "key");
    }

    #[test]
    fn captured_now_stamps_current_time() {
        let before = Utc::now().timestamp_millis();
        let state = SyncState::captured_now(Fingerprint::from("ff"));
        let after = Utc::now().timestamp_millis();
        assert!(state.captured_at_epoch_millis >= before);
        assert!(state.captured_at_epoch_millis <= after);
    }
}
