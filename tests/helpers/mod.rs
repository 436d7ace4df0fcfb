//! Shared test helpers for integration tests.
//!
//! Builds the full router over in-memory stores and temp-dir extension
//! roots, so the whole admin API and dynamic dispatch path can be
//! exercised without PostgreSQL.

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use bytes::Bytes;
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use megamon_api::{AppState, build_router};
use megamon_core::config::AppConfig;
use megamon_core::events::EventBus;
use megamon_extension::components::ComponentLoader;
use megamon_extension::entry::StaticEntryLoader;
use megamon_extension::lifecycle::LifecycleController;
use megamon_extension::mounter::RouteMounter;
use megamon_extension::provider::{
    ExtensionRequest, ExtensionResponse, RouteBinding, RouteMethod, RouteProvider,
};
use megamon_extension::relationships::RelationshipResolver;
use megamon_extension::testing::{MemoryLocaleStore, MemoryRegistry, MemorySchemaStore};

const MULTIPART_BOUNDARY: &str = "megamon-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Extension catalog (in-memory)
    pub registry: Arc<MemoryRegistry>,
    /// Locale pack store (in-memory)
    pub locales: Arc<MemoryLocaleStore>,
    /// Schema store (in-memory)
    pub schema: Arc<MemorySchemaStore>,
    /// Compiled-in backend entry table
    pub loader: Arc<StaticEntryLoader>,
    /// Application config
    pub config: Arc<AppConfig>,
    _root: tempfile::TempDir,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        Self::build(MemorySchemaStore::default(), json!({}))
    }

    /// Create a test application over a pre-seeded schema store
    pub fn with_schema(schema: MemorySchemaStore) -> Self {
        Self::build(schema, json!({}))
    }

    /// Create a test application with a short request timeout
    pub fn with_request_timeout(seconds: u64) -> Self {
        Self::build(
            MemorySchemaStore::default(),
            json!({ "request_timeout_seconds": seconds }),
        )
    }

    fn build(schema: MemorySchemaStore, server: Value) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");

        let config: AppConfig = serde_json::from_value(json!({
            "server": server,
            "database": { "url": "postgres://unused" },
            "extensions": {
                "backend_root": root.path().join("backend"),
                "frontend_root": root.path().join("frontend"),
                "uploads_root": root.path().join("uploads"),
                "staging_root": root.path().join("staging"),
            },
            "logging": {},
        }))
        .expect("Failed to build test config");
        let config = Arc::new(config);

        let registry = Arc::new(MemoryRegistry::default());
        let locales = Arc::new(MemoryLocaleStore::default());
        let schema = Arc::new(schema);
        let loader = Arc::new(StaticEntryLoader::new());

        let events = EventBus::new();
        let mounter = Arc::new(RouteMounter::new(
            loader.clone(),
            config.extensions.backend_root.clone(),
        ));
        let components = Arc::new(ComponentLoader::new(config.extensions.frontend_root.clone()));
        let lifecycle = Arc::new(LifecycleController::new(
            config.extensions.clone(),
            registry.clone(),
            locales.clone(),
            schema.clone(),
            mounter.clone(),
            components.clone(),
            events.clone(),
        ));
        let resolver = Arc::new(RelationshipResolver::new(
            registry.clone(),
            components.clone(),
            locales.clone(),
        ));

        let state = AppState {
            config: config.clone(),
            registry: registry.clone(),
            locale_store: locales.clone(),
            mounter,
            lifecycle,
            components,
            resolver,
            events,
        };

        Self {
            router: build_router(state),
            registry,
            locales,
            schema,
            loader,
            config,
            _root: root,
        }
    }

    /// Make an HTTP request with an optional JSON body
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Upload an extension bundle as a multipart `archive` field
    pub async fn upload(&self, bundle: Bytes) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"archive\"; filename=\"bundle.zip\"\r\n\
              Content-Type: application/zip\r\n\r\n",
        );
        body.extend_from_slice(&bundle);
        body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/extensions/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("Failed to build upload request");

        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` payload of a success envelope
    pub fn data(&self) -> &Value {
        self.body.get("data").expect("No data in response")
    }
}

/// Build an in-memory zip bundle from (path, content) pairs
pub fn build_bundle(entries: &[(&str, &str)]) -> Bytes {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        for (name, content) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .expect("Failed to start zip entry");
            writer
                .write_all(content.as_bytes())
                .expect("Failed to write zip entry");
        }
        writer.finish().expect("Failed to finish zip");
    }
    Bytes::from(buf.into_inner())
}

/// Frontend-only widget bundle with an English locale pack
pub fn widget_bundle() -> Bytes {
    build_bundle(&[
        (
            "frontend/manifest.json",
            r#"{
                "name": "ClockWidget",
                "version": "1.0.0",
                "frontend_entry": "ClockWidget.vue",
                "locales": ["en"]
            }"#,
        ),
        ("frontend/ClockWidget.vue", "<template>clock</template>"),
        ("frontend/locales/en.json", r#"{"clock.label": "Clock"}"#),
    ])
}

/// Backend-only bundle declaring a `routes.so` entry
pub fn backend_bundle(name: &str) -> Bytes {
    build_bundle(&[(
        "backend/manifest.json",
        &format!(r#"{{"name": "{name}", "version": "1.0.0", "backend_entry": "routes.so"}}"#),
    )])
}

struct PingHandler;

#[async_trait::async_trait]
impl megamon_extension::provider::ExtensionHandler for PingHandler {
    async fn handle(&self, _request: ExtensionRequest) -> megamon_core::AppResult<ExtensionResponse> {
        Ok(ExtensionResponse::ok(json!({"pong": true})))
    }
}

/// Route provider answering GET /ping, for compiled-in test extensions
pub struct PingProvider;

impl RouteProvider for PingProvider {
    fn routes(&self) -> Vec<RouteBinding> {
        vec![RouteBinding {
            method: RouteMethod::Get,
            path: "/ping".to_string(),
            handler: Arc::new(PingHandler),
        }]
    }
}
