//! Store client, document fetch and HTTP converter against a mock server.
//!
//! The clients are blocking; each call runs on `spawn_blocking` so the
//! mock server keeps serving on the async runtime.

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use specsync_core::{ArtifactId, StoreCredential};
use specsync_sync::{
    ArtifactStore, Converter, DocumentSource, HttpConverter, HttpFetch, PostmanClient, SyncError,
};

const KEY: &str = "PMAK-0123456789";

async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("blocking task")
}

fn client(server: &MockServer) -> PostmanClient {
    PostmanClient::with_base_url(server.uri(), StoreCredential::new(KEY))
}

fn collection() -> Value {
    json!({"info": {"name": "Petstore", "version": "1.0.0"}, "item": []})
}

// =============================================================================
// Credential probe
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn credential_probe_sends_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("X-Api-Key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    let store = client(&server);
    assert!(blocking(move || store.validate_credential()).await.expect("probe"));
}

#[tokio::test(flavor = "multi_thread")]
async fn credential_probe_rejection_is_false_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"name": "AuthenticationError", "message": "Invalid API Key"}
        })))
        .mount(&server)
        .await;

    let store = client(&server);
    assert!(!blocking(move || store.validate_credential()).await.expect("probe"));
}

#[tokio::test(flavor = "multi_thread")]
async fn credential_probe_server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = client(&server);
    let err = blocking(move || store.validate_credential()).await.unwrap_err();
    assert!(matches!(err, SyncError::Store { status: Some(503), .. }), "got {err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn credential_probe_only_treats_auth_statuses_as_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"name": "rateLimited", "message": "Rate limit exceeded"}
        })))
        .mount(&server)
        .await;

    let store = client(&server);
    let (forbidden, limited) = blocking(move || {
        (store.validate_credential(), store.validate_credential())
    })
    .await;

    assert!(!forbidden.expect("403 is a rejection"));
    let err = limited.unwrap_err();
    assert!(matches!(err, SyncError::Store { status: Some(429), .. }), "got {err}");
    assert!(err.to_string().contains("Rate limit exceeded"), "got {err}");
}

// =============================================================================
// Collections
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn list_prefers_uid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collections": [
                {"id": "a1", "uid": "12-a1", "name": "Petstore"},
                {"id": "b2", "name": "Legacy"},
                {"name": "no id at all"}
            ]
        })))
        .mount(&server)
        .await;

    let store = client(&server);
    let listed = blocking(move || store.list()).await.expect("list");
    let ids: Vec<_> = listed.iter().map(|c| c.id.0.as_str()).collect();
    assert_eq!(ids, ["12-a1", "b2"]);
    assert_eq!(listed[0].name, "Petstore");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_wraps_data_and_returns_uid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .and(header("X-Api-Key", KEY))
        .and(body_json(json!({"collection": collection()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": {"id": "c1", "name": "Petstore", "uid": "12-c1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = client(&server);
    let converted = json!({"type": "collection", "data": collection()});
    let id = blocking(move || store.create(&converted)).await.expect("create");
    assert_eq!(id, ArtifactId::from("12-c1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn get_missing_collection_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"name": "instanceNotFoundError", "message": "not found"}
        })))
        .mount(&server)
        .await;

    let store = client(&server);
    let found = blocking(move || store.get(&ArtifactId::from("gone")))
        .await
        .expect("get");
    assert!(found.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn get_server_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/c1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = client(&server);
    let err = blocking(move || store.get(&ArtifactId::from("c1")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "get collection failed (HTTP 500): boom");
}

#[tokio::test(flavor = "multi_thread")]
async fn update_puts_normalized_payload() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/collections/12-c1"))
        .and(body_json(json!({"collection": collection()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": {"id": "c1", "uid": "12-c1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = client(&server);
    let bare = collection();
    blocking(move || store.update(&ArtifactId::from("12-c1"), &bare))
        .await
        .expect("update");
}

// =============================================================================
// Source document
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn source_fetch_asks_for_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "openapi": "3.0.0",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "paths": {"/pets": {}}
        })))
        .mount(&server)
        .await;

    let url = format!("{}/openapi.json", server.uri());
    let (doc, raw) = blocking(move || {
        let mut source = DocumentSource::http(url);
        let doc = source.fetch();
        (doc, source.raw_capture().cloned())
    })
    .await;
    assert_eq!(doc.expect("fetch").path_count, 1);
    assert_eq!(raw.expect("capture")["info"]["title"], "Petstore");
}

#[tokio::test(flavor = "multi_thread")]
async fn source_http_error_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let url = format!("{}/openapi.json", server.uri());
    let err = blocking(move || DocumentSource::http(url).fetch())
        .await
        .unwrap_err();
    let SyncError::Fetch { message, .. } = &err else {
        panic!("expected fetch error, got {err:?}");
    };
    assert!(message.contains("502"), "got {message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_source_body_is_rejected_by_size() {
    let server = MockServer::start().await;
    let document = json!({
        "openapi": "3.0.0",
        "info": {"title": "Petstore", "version": "1.0.0"},
        "paths": {"/pets": {}}
    });
    let size = serde_json::to_vec(&document).expect("encode").len() as u64;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(&server)
        .await;

    let url = format!("{}/openapi.json", server.uri());
    let (exact, over) = blocking(move || {
        let exact = DocumentSource::new(
            url.clone(),
            Box::new(HttpFetch::new().with_body_limit(size)),
        )
        .fetch();
        let over = DocumentSource::new(url, Box::new(HttpFetch::new().with_body_limit(size - 1)))
            .fetch();
        (exact, over)
    })
    .await;

    assert_eq!(exact.expect("body at the limit").path_count, 1);
    let err = over.unwrap_err();
    let SyncError::Fetch { message, .. } = &err else {
        panic!("expected fetch error, got {err:?}");
    };
    assert!(message.contains("exceeds the limit"), "got {message}");
}

// =============================================================================
// Conversion service
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn http_converter_posts_envelope() {
    let server = MockServer::start().await;
    let document = json!({"openapi": "3.0.0", "info": {}, "paths": {}});
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(body_json(json!({
            "input": {"type": "json", "data": document},
            "options": {
                "folderStrategy": "Tags",
                "requestParametersResolution": "Example",
                "exampleParametersResolution": "Example",
                "optimizeConversion": false,
                "stackLimit": 50
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": true,
            "output": [{"type": "collection", "data": collection()}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let converter = HttpConverter::new(format!("{}/convert", server.uri()));
    let artifact = blocking(move || converter.convert(&document))
        .await
        .expect("convert");
    assert_eq!(artifact.0["data"], collection());
}

#[tokio::test(flavor = "multi_thread")]
async fn http_converter_reports_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": false,
            "reason": "Invalid format"
        })))
        .mount(&server)
        .await;

    let converter = HttpConverter::new(format!("{}/convert", server.uri()));
    let err = blocking(move || converter.convert(&json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "conversion failed: Invalid format");
}
