//! Endpoint/folder summaries and the old → new delta report.
//!
//! A collection is a tree of items. An item with a `request` is an endpoint;
//! an item with nested `item`s and no `request` is a folder. Endpoints are
//! leaves: nested items under an endpoint are not visited.

use std::fmt;

use serde_json::Value;

use specsync_core::ArtifactId;

use crate::convert::STACK_LIMIT;
use crate::SyncError;

/// Reported when a collection declares no `info.version`.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Counts derived from one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifactSummary {
    pub id: Option<ArtifactId>,
    pub endpoint_count: usize,
    pub folder_count: usize,
    pub declared_version: String,
}

/// Which envelope field to try first when unwrapping the collection body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// Store responses: `collection`, then `data`.
    Stored,
    /// Converter output: `data`, then `collection`.
    Converted,
}

impl RemoteArtifactSummary {
    /// Summarise an artifact, walking at most [`STACK_LIMIT`] levels.
    pub fn from_artifact(
        id: Option<ArtifactId>,
        artifact: &Value,
        envelope: Envelope,
    ) -> Result<Self, SyncError> {
        Self::with_depth_limit(id, artifact, envelope, STACK_LIMIT)
    }

    pub fn with_depth_limit(
        id: Option<ArtifactId>,
        artifact: &Value,
        envelope: Envelope,
        max_depth: usize,
    ) -> Result<Self, SyncError> {
        let body = unwrap_body(artifact, envelope);
        if !body.is_object() {
            return Err(SyncError::InvalidDocument(
                "collection body is not an object".to_string(),
            ));
        }
        let (endpoint_count, folder_count) = count_items(body, max_depth)?;
        let declared_version = body
            .get("info")
            .and_then(|info| info.get("version"))
            .and_then(version_text)
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
        Ok(Self {
            id,
            endpoint_count,
            folder_count,
            declared_version,
        })
    }
}

fn unwrap_body(artifact: &Value, envelope: Envelope) -> &Value {
    let order = match envelope {
        Envelope::Stored => ["collection", "data"],
        Envelope::Converted => ["data", "collection"],
    };
    order
        .iter()
        .find_map(|key| artifact.get(key).filter(|v| !v.is_null()))
        .unwrap_or(artifact)
}

fn version_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // Collection v2.0 allows {"major": 1, "minor": 2, "patch": 0}.
        Value::Object(parts) => {
            let part = |k: &str| parts.get(k).and_then(Value::as_u64);
            Some(format!("{}.{}.{}", part("major")?, part("minor")?, part("patch")?))
        }
        _ => None,
    }
}

/// Explicit-stack walk over `item` arrays.
fn count_items(body: &Value, max_depth: usize) -> Result<(usize, usize), SyncError> {
    let mut endpoints = 0;
    let mut folders = 0;
    let mut stack: Vec<(&[Value], usize)> = Vec::new();
    if let Some(items) = body.get("item").and_then(Value::as_array) {
        stack.push((items.as_slice(), 1));
    }

    while let Some((items, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(SyncError::TooDeep { limit: max_depth });
        }
        for item in items {
            if item.get("request").is_some_and(|r| !r.is_null()) {
                endpoints += 1;
            } else if let Some(children) = item.get("item").and_then(Value::as_array) {
                folders += 1;
                stack.push((children.as_slice(), depth + 1));
            }
        }
    }
    Ok((endpoints, folders))
}

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// Old and new value of one tracked quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    pub old: T,
    pub new: T,
}

impl Change<usize> {
    /// Signed difference `new - old`.
    pub fn diff(&self) -> i64 {
        self.new as i64 - self.old as i64
    }
}

impl<T: PartialEq> Change<T> {
    pub fn is_unchanged(&self) -> bool {
        self.old == self.new
    }
}

/// Observational report of what an update is about to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDelta {
    pub endpoints: Change<usize>,
    pub folders: Change<usize>,
    pub version: Change<String>,
}

impl ArtifactDelta {
    pub fn between(old: &RemoteArtifactSummary, new: &RemoteArtifactSummary) -> Self {
        Self {
            endpoints: Change {
                old: old.endpoint_count,
                new: new.endpoint_count,
            },
            folders: Change {
                old: old.folder_count,
                new: new.folder_count,
            },
            version: Change {
                old: old.declared_version.clone(),
                new: new.declared_version.clone(),
            },
        }
    }

    /// Summarise the stored collection and the fresh conversion, then diff.
    pub fn compute(
        id: &ArtifactId,
        existing: &Value,
        converted: &Value,
    ) -> Result<Self, SyncError> {
        let old = RemoteArtifactSummary::from_artifact(Some(id.clone()), existing, Envelope::Stored)?;
        let new = RemoteArtifactSummary::from_artifact(None, converted, Envelope::Converted)?;
        Ok(Self::between(&old, &new))
    }

    /// One human-readable line per tracked quantity.
    pub fn lines(&self) -> Vec<String> {
        vec![
            count_line("Endpoints", &self.endpoints),
            count_line("Folders", &self.folders),
            if self.version.is_unchanged() {
                format!("Version: {} (no change)", self.version.new)
            } else {
                format!("Version: {} → {}", self.version.old, self.version.new)
            },
        ]
    }
}

impl fmt::Display for ArtifactDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join(", "))
    }
}

fn count_line(label: &str, change: &Change<usize>) -> String {
    if change.is_unchanged() {
        format!("{label}: {} (no change)", change.new)
    } else {
        format!("{label}: {} → {} ({:+})", change.old, change.new, change.diff())
    }
}
