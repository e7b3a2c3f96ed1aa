//! Health endpoint tests

use std::sync::Arc;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use ratelimit_gate::domain::WindowConfig;

use crate::common::{TestApp, UnreachableStore};

#[tokio::test]
async fn test_health_check() {
    let (app, _store) = TestApp::new(WindowConfig::default());

    let response = app.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_liveness() {
    let (app, _store) = TestApp::new(WindowConfig::default());

    let body: Value = app.get("/health/live").await.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_readiness_with_reachable_store() {
    let (app, _store) = TestApp::new(WindowConfig::default());

    let response = app.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["store"]["backend"], "memory");
    assert!(body["store"]["latency_ms"].is_u64());
}

#[tokio::test]
async fn test_readiness_with_unreachable_store() {
    let app = TestApp::with_store(Arc::new(UnreachableStore), WindowConfig::default(), true);

    let response = app.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert!(body["store"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Store connection failed"));
}
