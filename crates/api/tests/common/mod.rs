#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use vitals_api::config::ServerConfig;
use vitals_api::router::build_app_router;
use vitals_api::state::AppState;
use vitals_cache::{MemoryCacheBackend, RecencyCache};
use vitals_db::memory::MemoryVitalStore;
use vitals_pipeline::{RecordProcessor, VitalsService};
use vitals_queue::{JobOptions, MemoryJobQueue, QueueWorker, WorkerConfig};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
    }
}

/// The application wired to in-memory backends, plus handles to drive the
/// queue and break backends from tests.
pub struct TestApp {
    pub router: Router,
    pub worker: QueueWorker,
    pub store: Arc<MemoryVitalStore>,
    pub cache_backend: Arc<MemoryCacheBackend>,
    pub queue: Arc<MemoryJobQueue>,
}

/// Build the full application router with the production middleware stack.
pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryVitalStore::new());
    let cache_backend = Arc::new(MemoryCacheBackend::new());
    let cache = RecencyCache::new(cache_backend.clone(), Duration::from_millis(250));
    let queue = Arc::new(MemoryJobQueue::new());

    let job_options = JobOptions {
        backoff: Duration::ZERO,
        ..JobOptions::default()
    };
    let service = VitalsService::new(store.clone(), cache.clone(), queue.clone(), job_options);
    let processor = Arc::new(RecordProcessor::new(store.clone(), cache));
    let worker = QueueWorker::new(queue.clone(), processor, WorkerConfig::default());

    let config = test_config();
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        worker,
        store,
        cache_backend,
        queue,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
