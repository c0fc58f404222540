//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use uploadhub_api::{AppState, build_app};
use uploadhub_core::config::AppConfig;
use uploadhub_core::types::{ActorId, ScopeId};
use uploadhub_database::{MemoryScopeDirectory, MemoryUploadSessionStore};
use uploadhub_service::UploadStack;
use uploadhub_storage::LocalBlobStore;

/// PNG signature; any payload starting with it sniffs as `image/png`.
pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Upload stack behind the router
    pub stack: UploadStack,
    /// Scope membership
    pub directory: MemoryScopeDirectory,
    /// Application config
    pub config: AppConfig,
    /// Keeps the data directory alive
    pub data_dir: tempfile::TempDir,
}

/// Response status plus parsed JSON body (`Null` when empty or not JSON)
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Create a new test application over in-memory stores
    pub async fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.uploads.root_path = data_dir.path().join("uploads");
        config.uploads.default_chunk_size_bytes = 8;
        config.uploads.max_chunk_size_bytes = 64;
        config.uploads.max_file_size_bytes = 1024;
        config.uploads.session_ttl_seconds = 3600;
        config.uploads.max_active_sessions_per_actor = 3;
        config.blob.root_path = data_dir.path().join("blobs");
        config.worker.enabled = false;

        let directory = MemoryScopeDirectory::new();
        let blob_store = LocalBlobStore::new(
            &config.blob.root_path,
            config.blob.public_path_prefix.clone(),
            config.uploads.max_file_size_bytes,
        )
        .await
        .expect("Failed to init blob store");

        let stack = UploadStack::assemble(
            &config,
            Arc::new(MemoryUploadSessionStore::new()),
            Arc::new(blob_store),
            Arc::new(directory.clone()),
            Arc::new(directory.clone()),
            None,
        )
        .await
        .expect("Failed to build upload stack");

        let state = AppState {
            config: Arc::new(config.clone()),
            session_store: Arc::clone(&stack.store),
            upload_service: Arc::clone(&stack.service),
            metrics: Arc::clone(&stack.metrics),
        };

        Self {
            router: build_app(state),
            stack,
            directory,
            config,
            data_dir,
        }
    }

    /// Register a fresh actor in a fresh scope
    pub fn member(&self) -> (ActorId, ScopeId) {
        let actor = ActorId::new();
        let scope = ScopeId::new();
        self.directory.add_member(scope, actor);
        (actor, scope)
    }

    /// Send a request and collect the response
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        actor: Option<ActorId>,
        body: Body,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header("x-actor-id", actor.to_string());
        }
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let request = builder.body(body).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    /// POST a JSON body
    pub async fn post_json(&self, uri: &str, actor: ActorId, json: Value) -> TestResponse {
        self.send(
            "POST",
            uri,
            Some(actor),
            Body::from(json.to_string()),
            Some("application/json"),
        )
        .await
    }

    /// Open a PNG session and return its id
    pub async fn create_session(&self, actor: ActorId, scope: ScopeId, total: i64) -> String {
        let res = self
            .post_json(
                &sessions_uri(scope),
                actor,
                serde_json::json!({
                    "content_type": "image/png",
                    "total_size_bytes": total,
                    "original_file_name": "photo.png",
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["data"]["session_id"]
            .as_str()
            .expect("session_id missing")
            .to_string()
    }

    /// PUT one chunk
    pub async fn put_chunk(
        &self,
        actor: ActorId,
        scope: ScopeId,
        session: &str,
        index: i32,
        bytes: &[u8],
    ) -> TestResponse {
        self.send(
            "PUT",
            &format!("{}/chunks/{index}", session_uri(scope, session)),
            Some(actor),
            Body::from(bytes.to_vec()),
            Some("application/octet-stream"),
        )
        .await
    }
}

/// Collection URI for a scope's sessions
pub fn sessions_uri(scope: ScopeId) -> String {
    format!("/api/scopes/{scope}/uploads/sessions")
}

/// URI of one session
pub fn session_uri(scope: ScopeId, session: &str) -> String {
    format!("{}/{session}", sessions_uri(scope))
}

/// A 16-byte PNG-looking payload: signature followed by `BBBBBBBB`.
pub fn png_payload() -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.extend_from_slice(b"BBBBBBBB");
    bytes
}
