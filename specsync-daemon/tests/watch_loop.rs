//! Watch loop over a real `SyncContext` with in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use specsync_core::{persistence, ArtifactId, StoreCredential, SyncConfig};
use specsync_daemon::{run_watch, stop_pair, StopHandle, WatchReport};
use specsync_sync::{
    ArtifactStore, CollectionSummary, ConvertedArtifact, Converter, DocumentFetch,
    DocumentSource, SyncContext, SyncError,
};

const SOURCE_URL: &str = "https://api.example.com/openapi.json";

/// Serves `docs[n]` on fetch `n`; `None` is a transport failure. Stops the
/// loop after the last scripted fetch.
struct ScriptedFetch {
    docs: Vec<Option<Value>>,
    fetches: Arc<AtomicUsize>,
    stop: StopHandle,
}

impl DocumentFetch for ScriptedFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, SyncError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        if n + 1 >= self.docs.len() {
            self.stop.stop();
        }
        match self.docs.get(n).cloned().flatten() {
            Some(doc) => Ok(serde_json::to_vec(&doc).expect("encode")),
            None => Err(SyncError::Fetch {
                url: url.to_string(),
                message: "connection reset by peer".to_string(),
            }),
        }
    }
}

#[derive(Clone, Default)]
struct MemoryStore(Arc<Mutex<Vec<String>>>);

impl ArtifactStore for MemoryStore {
    fn validate_credential(&self) -> Result<bool, SyncError> {
        Ok(true)
    }

    fn list(&self) -> Result<Vec<CollectionSummary>, SyncError> {
        Ok(vec![])
    }

    fn create(&self, _artifact: &Value) -> Result<ArtifactId, SyncError> {
        self.0.lock().expect("lock").push("create".to_string());
        Ok(ArtifactId::from("c-1"))
    }

    fn get(&self, _id: &ArtifactId) -> Result<Option<Value>, SyncError> {
        Ok(Some(json!({"collection": {"info": {"version": "1"}, "item": []}})))
    }

    fn update(&self, id: &ArtifactId, _artifact: &Value) -> Result<(), SyncError> {
        self.0.lock().expect("lock").push(format!("update {id}"));
        Ok(())
    }
}

struct Passthrough;

impl Converter for Passthrough {
    fn convert(&self, document: &Value) -> Result<ConvertedArtifact, SyncError> {
        Ok(ConvertedArtifact(json!({
            "info": {"name": document["info"]["title"], "version": document["info"]["version"]},
            "item": []
        })))
    }
}

fn doc(version: &str) -> Option<Value> {
    Some(json!({
        "openapi": "3.0.0",
        "info": {"title": "Petstore", "version": version},
        "paths": {"/pets": {}}
    }))
}

#[tokio::test(start_paused = true)]
async fn transport_failure_mid_watch_is_survived() {
    let dir = TempDir::new().expect("dir");
    let (handle, signal) = stop_pair();
    let fetches = Arc::new(AtomicUsize::new(0));
    let store = MemoryStore::default();

    let config = SyncConfig::new(SOURCE_URL, StoreCredential::new("PMAK-k"), None, 10)
        .expect("config");
    let source = DocumentSource::new(
        SOURCE_URL,
        Box::new(ScriptedFetch {
            docs: vec![doc("1.0.0"), None, doc("1.1.0")],
            fetches: fetches.clone(),
            stop: handle,
        }),
    );
    let context = SyncContext::new(
        config,
        dir.path(),
        source,
        Box::new(store.clone()),
        Box::new(Passthrough),
    );

    let report = run_watch(context, Duration::from_secs(10), signal)
        .await
        .expect("watch");

    assert_eq!(fetches.load(Ordering::SeqCst), 3);
    assert_eq!(
        report,
        WatchReport {
            passes: 3,
            published: 2,
            failures: 1
        }
    );
    assert_eq!(*store.0.lock().expect("lock"), ["create", "update c-1"]);
    assert!(persistence::load_state_at(dir.path())
        .expect("state")
        .is_some());
}
