//! Source document fetch and minimal validation.
//!
//! [`DocumentSource`] keeps the newest raw capture. A fetch drops the previous
//! capture before the request goes out and stores the new body before it is
//! validated, so a later fingerprint or conversion always sees what the
//! server returned last, never an older valid document.

use std::io::Read;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::SyncError;

/// Bounded timeout for the source GET.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default upper bound on a source document body.
pub const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Retrieves the raw body of the source document.
pub trait DocumentFetch: Send {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SyncError>;
}

/// `GET <url>` with `Accept: application/json` and a 10s timeout.
pub struct HttpFetch {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpFetch {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    /// Reject bodies larger than `limit` bytes.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

impl Default for HttpFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentFetch for HttpFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SyncError> {
        let fetch_err = |message: String| SyncError::Fetch {
            url: url.to_string(),
            message,
        };
        let response = match self
            .agent
            .get(url)
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(fetch_err(format!(
                    "HTTP {code} {}",
                    response.status_text()
                )));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(fetch_err(transport.to_string()));
            }
        };

        // One byte past the limit tells an oversized body from one that
        // fits exactly.
        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.max_body_bytes.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| fetch_err(format!("reading body: {e}")))?;
        if body.len() as u64 > self.max_body_bytes {
            return Err(fetch_err(format!(
                "response body exceeds the limit of {} bytes",
                self.max_body_bytes
            )));
        }
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Logical view
// ---------------------------------------------------------------------------

/// Which version marker a document declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecVersion {
    OpenApi(String),
    Swagger(String),
}

impl std::fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecVersion::OpenApi(v) => write!(f, "OpenAPI {v}"),
            SpecVersion::Swagger(v) => write!(f, "Swagger {v}"),
        }
    }
}

/// Minimally validated view of a fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub spec_version: SpecVersion,
    pub title: Option<String>,
    pub api_version: Option<String>,
    pub path_count: usize,
}

impl SourceDocument {
    /// Validate a raw document: a version marker (`openapi` or `swagger`,
    /// either is enough) plus non-null `info` and `paths` sections.
    pub fn from_raw(raw: &Value) -> Result<Self, SyncError> {
        let Value::Object(root) = raw else {
            return Err(SyncError::InvalidDocument(
                "top-level value is not an object".to_string(),
            ));
        };

        let spec_version = version_marker(root).ok_or_else(|| {
            SyncError::InvalidDocument(
                "missing version field (expected 'openapi' or 'swagger')".to_string(),
            )
        })?;

        let info = present(root, "info")
            .ok_or_else(|| SyncError::InvalidDocument("missing 'info' section".to_string()))?;
        let paths = present(root, "paths")
            .ok_or_else(|| SyncError::InvalidDocument("missing 'paths' section".to_string()))?;

        Ok(Self {
            spec_version,
            title: info.get("title").and_then(Value::as_str).map(str::to_string),
            api_version: info
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
            path_count: paths.as_object().map(Map::len).unwrap_or(0),
        })
    }
}

fn present<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    root.get(key).filter(|v| !v.is_null())
}

fn version_marker(root: &Map<String, Value>) -> Option<SpecVersion> {
    let as_text = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    if let Some(v) = root.get("openapi").and_then(as_text) {
        return Some(SpecVersion::OpenApi(v));
    }
    root.get("swagger").and_then(as_text).map(SpecVersion::Swagger)
}

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// Fetches the configured URL and retains the newest raw capture.
pub struct DocumentSource {
    url: String,
    fetcher: Box<dyn DocumentFetch>,
    raw: Option<Value>,
}

impl DocumentSource {
    pub fn new(url: impl Into<String>, fetcher: Box<dyn DocumentFetch>) -> Self {
        Self {
            url: url.into(),
            fetcher,
            raw: None,
        }
    }

    /// HTTP-backed source with the default timeout.
    pub fn http(url: impl Into<String>) -> Self {
        Self::new(url, Box::new(HttpFetch::new()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and validate. The raw capture is replaced even when validation
    /// fails, and cleared when the body is unreachable or not JSON.
    pub fn fetch(&mut self) -> Result<SourceDocument, SyncError> {
        tracing::info!("fetching source document from {}", self.url);
        self.raw = None;

        let body = self.fetcher.fetch(&self.url)?;
        let raw: Value = serde_json::from_slice(&body).map_err(|e| {
            SyncError::InvalidDocument(format!("response body is not valid JSON: {e}"))
        })?;
        let raw = self.raw.insert(raw);

        let document = SourceDocument::from_raw(raw)?;
        tracing::info!(
            "fetched {} document '{}' ({} paths)",
            document.spec_version,
            document.title.as_deref().unwrap_or("untitled"),
            document.path_count
        );
        Ok(document)
    }

    /// The last body fetched, if it parsed as JSON.
    pub fn raw_capture(&self) -> Option<&Value> {
        self.raw.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Serves queued bodies in order.
    struct Scripted(Arc<Mutex<Vec<Result<Vec<u8>, String>>>>);

    impl DocumentFetch for Scripted {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, SyncError> {
            let next = self.0.lock().expect("lock").remove(0);
            next.map_err(|message| SyncError::Fetch {
                url: url.to_string(),
                message,
            })
        }
    }

    fn source(bodies: Vec<Result<Value, String>>) -> DocumentSource {
        let bytes = bodies
            .into_iter()
            .map(|b| b.map(|v| serde_json::to_vec(&v).expect("encode")))
            .collect();
        DocumentSource::new(
            "https://api.example.com/openapi.json",
            Box::new(Scripted(Arc::new(Mutex::new(bytes)))),
        )
    }

    fn valid() -> Value {
        json!({
            "openapi": "3.0.1",
            "info": {"title": "Petstore", "version": "1.2.0"},
            "paths": {"/pets": {}, "/pets/{id}": {}}
        })
    }

    #[test]
    fn valid_openapi_document_is_accepted() {
        let mut src = source(vec![Ok(valid())]);
        let doc = src.fetch().expect("fetch");
        assert_eq!(doc.spec_version, SpecVersion::OpenApi("3.0.1".to_string()));
        assert_eq!(doc.title.as_deref(), Some("Petstore"));
        assert_eq!(doc.api_version.as_deref(), Some("1.2.0"));
        assert_eq!(doc.path_count, 2);
        assert_eq!(src.raw_capture(), Some(&valid()));
    }

    #[test]
    fn swagger_marker_satisfies_version_check() {
        let doc = SourceDocument::from_raw(&json!({
            "swagger": "2.0",
            "info": {"title": "Legacy", "version": "1"},
            "paths": {}
        }))
        .expect("valid swagger");
        assert_eq!(doc.spec_version, SpecVersion::Swagger("2.0".to_string()));
    }

    #[test]
    fn both_markers_present_is_accepted() {
        let doc = SourceDocument::from_raw(&json!({
            "openapi": "3.0.0",
            "swagger": "2.0",
            "info": {},
            "paths": {}
        }))
        .expect("either marker satisfies");
        assert!(matches!(doc.spec_version, SpecVersion::OpenApi(_)));
    }

    #[test]
    fn missing_elements_are_named() {
        let cases = [
            (json!({"info": {}, "paths": {}}), "version field"),
            (json!({"openapi": "3.0.0", "paths": {}}), "'info'"),
            (json!({"openapi": "3.0.0", "info": {}}), "'paths'"),
            (json!({"openapi": "3.0.0", "info": null, "paths": {}}), "'info'"),
            (json!(["not", "an", "object"]), "not an object"),
        ];
        for (raw, expected) in cases {
            let err = SourceDocument::from_raw(&raw).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{expected}' in '{err}'"
            );
        }
    }

    #[test]
    fn invalid_document_still_replaces_capture() {
        let broken = json!({"openapi": "3.0.0", "info": {"title": "x"}});
        let mut src = source(vec![Ok(valid()), Ok(broken.clone())]);
        src.fetch().expect("first fetch");

        let err = src.fetch().unwrap_err();
        assert!(matches!(err, SyncError::InvalidDocument(_)));
        assert_eq!(src.raw_capture(), Some(&broken));
    }

    #[test]
    fn failed_fetch_clears_stale_capture() {
        let mut src = source(vec![Ok(valid()), Err("connection reset".to_string())]);
        src.fetch().expect("first fetch");

        let err = src.fetch().unwrap_err();
        assert!(matches!(err, SyncError::Fetch { .. }));
        assert!(src.raw_capture().is_none());
    }

    #[test]
    fn non_json_body_clears_capture() {
        let mut src = DocumentSource::new(
            "https://api.example.com/openapi.yaml",
            Box::new(Scripted(Arc::new(Mutex::new(vec![Ok(
                b"openapi: 3.0.0\n".to_vec()
            )])))),
        );
        let err = src.fetch().unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
        assert!(src.raw_capture().is_none());
    }
}
