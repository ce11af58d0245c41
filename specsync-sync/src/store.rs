//! Artifact store client (Postman API).
//!
//! | operation | request |
//! |---|---|
//! | credential probe | `GET /me` |
//! | list | `GET /collections` |
//! | create | `POST /collections`, body `{"collection": …}` |
//! | read | `GET /collections/{id}` (404 ⇒ `None`) |
//! | update | `PUT /collections/{id}`, body `{"collection": …}` |

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use specsync_core::{ArtifactId, StoreCredential};

use crate::SyncError;

pub const DEFAULT_STORE_URL: &str = "https://api.getpostman.com";

const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// `{id, name}` pair from `GET /collections`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    pub id: ArtifactId,
    pub name: String,
}

/// Remote store of published collections.
pub trait ArtifactStore: Send {
    /// `Ok(false)` when the store rejects the credential; `Err` only for
    /// transport and server failures.
    fn validate_credential(&self) -> Result<bool, SyncError>;

    fn list(&self) -> Result<Vec<CollectionSummary>, SyncError>;

    /// Publish a new collection and return its store-assigned id.
    fn create(&self, artifact: &Value) -> Result<ArtifactId, SyncError>;

    /// `Ok(None)` when the store answers 404.
    fn get(&self, id: &ArtifactId) -> Result<Option<Value>, SyncError>;

    fn update(&self, id: &ArtifactId, artifact: &Value) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// Payload normalization
// ---------------------------------------------------------------------------

/// Bring a converted artifact into the `{"collection": …}` envelope.
///
/// - `{"data": X, …}` → `{"collection": X}`
/// - `{"collection": X, …}` → unchanged
/// - anything else `X` → `{"collection": X}`
///
/// Create and update both call this, so the same artifact always produces
/// the same wire payload.
pub fn normalize_payload(artifact: &Value) -> Value {
    if let Some(data) = field(artifact, "data") {
        return json!({ "collection": data });
    }
    if field(artifact, "collection").is_some() {
        return artifact.clone();
    }
    json!({ "collection": artifact })
}

/// A present, non-null field of an object.
fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_object()?.get(key).filter(|v| !v.is_null())
}

// ---------------------------------------------------------------------------
// PostmanClient
// ---------------------------------------------------------------------------

/// Blocking Postman API client.
pub struct PostmanClient {
    agent: ureq::Agent,
    base_url: String,
    credential: StoreCredential,
}

#[derive(Debug, Deserialize)]
struct CreatedEnvelope {
    collection: CreatedCollection,
}

#[derive(Debug, Deserialize)]
struct CreatedCollection {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    uid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    collections: Vec<ListedCollection>,
}

#[derive(Debug, Deserialize)]
struct ListedCollection {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    name: String,
}

impl PostmanClient {
    pub fn new(credential: StoreCredential) -> Self {
        Self::with_base_url(DEFAULT_STORE_URL, credential)
    }

    pub fn with_base_url(base_url: impl Into<String>, credential: StoreCredential) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(STORE_TIMEOUT).build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{path}", self.base_url))
            .set("X-Api-Key", self.credential.expose())
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
    }
}

impl ArtifactStore for PostmanClient {
    fn validate_credential(&self) -> Result<bool, SyncError> {
        tracing::info!("validating artifact store credential");
        match self.request("GET", "/me").call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::Status(code @ (401 | 403), _)) => {
                tracing::warn!("credential rejected by store (HTTP {code})");
                Ok(false)
            }
            Err(err) => Err(store_err("validate credential", err)),
        }
    }

    fn list(&self) -> Result<Vec<CollectionSummary>, SyncError> {
        let response = self
            .request("GET", "/collections")
            .call()
            .map_err(|e| store_err("list collections", e))?;
        let envelope: ListEnvelope = read_json("list collections", response)?;
        Ok(envelope
            .collections
            .into_iter()
            .filter_map(|c| {
                let id = c.uid.or(c.id)?;
                Some(CollectionSummary {
                    id: ArtifactId(id),
                    name: c.name,
                })
            })
            .collect())
    }

    fn create(&self, artifact: &Value) -> Result<ArtifactId, SyncError> {
        tracing::info!("creating new collection");
        let response = self
            .request("POST", "/collections")
            .send_json(normalize_payload(artifact))
            .map_err(|e| store_err("create collection", e))?;
        let envelope: CreatedEnvelope = read_json("create collection", response)?;
        let id = envelope
            .collection
            .uid
            .or(envelope.collection.id)
            .ok_or_else(|| SyncError::Store {
                operation: "create collection",
                status: None,
                message: "response carried no collection id".to_string(),
            })?;
        tracing::info!("collection created: {id}");
        Ok(ArtifactId(id))
    }

    fn get(&self, id: &ArtifactId) -> Result<Option<Value>, SyncError> {
        match self.request("GET", &format!("/collections/{id}")).call() {
            Ok(response) => read_json("get collection", response).map(Some),
            Err(ureq::Error::Status(404, _)) => {
                tracing::warn!("collection {id} not found");
                Ok(None)
            }
            Err(err) => Err(store_err("get collection", err)),
        }
    }

    fn update(&self, id: &ArtifactId, artifact: &Value) -> Result<(), SyncError> {
        tracing::info!("updating collection {id}");
        self.request("PUT", &format!("/collections/{id}"))
            .send_json(normalize_payload(artifact))
            .map_err(|e| store_err("update collection", e))?;
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: ureq::Response,
) -> Result<T, SyncError> {
    response.into_json().map_err(|e| SyncError::Store {
        operation,
        status: None,
        message: format!("unreadable response body: {e}"),
    })
}

fn store_err(operation: &'static str, err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            SyncError::Store {
                operation,
                status: Some(code),
                message: error_message(&body).unwrap_or(body),
            }
        }
        ureq::Error::Transport(transport) => SyncError::Store {
            operation,
            status: None,
            message: transport.to_string(),
        },
    }
}

/// Postman error bodies look like `{"error": {"name": …, "message": …}}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error: &Map<String, Value> = value.get("error")?.as_object()?;
    let message = error.get("message")?.as_str()?;
    match error.get("name").and_then(Value::as_str) {
        Some(name) => Some(format!("{name}: {message}")),
        None => Some(message.to_string()),
    }
}
