//! Rate limit gate tests
//!
//! Drive the full router through the gate with an in-process store and a
//! manually advanced clock.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use ratelimit_gate::domain::WindowConfig;
use ratelimit_gate::presentation::middleware::{
    X_RATE_LIMIT_ERR, X_RATE_LIMIT_LIMIT, X_RATE_LIMIT_REMAINING, X_RATE_LIMIT_RESET,
};

use crate::common::{header, TestApp, UnreachableStore};

fn window(capacity: u32, secs: u64) -> WindowConfig {
    WindowConfig::per_seconds(capacity, secs).unwrap()
}

#[tokio::test]
async fn test_requests_within_capacity_are_granted() {
    let (app, _store) = TestApp::new(window(2, 60));

    let first = app.get("/api/v1/ping").await;
    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(header(&first, &X_RATE_LIMIT_LIMIT), Some("2"));
    assert_eq!(header(&first, &X_RATE_LIMIT_REMAINING), Some("1"));
    assert_eq!(header(&first, &X_RATE_LIMIT_RESET), Some("60"));
    assert_eq!(header(&first, &X_RATE_LIMIT_ERR), None);

    app.clock.advance(Duration::from_millis(1));
    let second = app.get("/api/v1/ping").await;
    assert_eq!(second.status_code(), StatusCode::OK);
    assert_eq!(header(&second, &X_RATE_LIMIT_REMAINING), Some("0"));
}

#[tokio::test]
async fn test_request_over_capacity_is_rejected() {
    let (app, _store) = TestApp::new(window(2, 60));

    for _ in 0..2 {
        assert_eq!(app.get("/api/v1/ping").await.status_code(), StatusCode::OK);
        app.clock.advance(Duration::from_millis(1));
    }

    let rejected = app.get("/api/v1/ping").await;
    assert_eq!(rejected.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&rejected, &X_RATE_LIMIT_LIMIT), Some("2"));
    assert_eq!(header(&rejected, &X_RATE_LIMIT_REMAINING), Some("0"));
    assert_eq!(header(&rejected, &X_RATE_LIMIT_RESET), Some("60"));

    let body: Value = rejected.json();
    assert_eq!(body["code"], 429);
    assert_eq!(body["message"], "Rate limit exceeded");
}

#[tokio::test]
async fn test_quota_returns_once_window_passes() {
    let (app, _store) = TestApp::new(window(1, 10));

    assert_eq!(app.get("/api/v1/ping").await.status_code(), StatusCode::OK);
    app.clock.advance(Duration::from_secs(5));
    assert_eq!(
        app.get("/api/v1/ping").await.status_code(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // Both earlier entries, the rejected one included, must age out.
    app.clock.advance(Duration::from_secs(11));
    let response = app.get("/api/v1/ping").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(header(&response, &X_RATE_LIMIT_REMAINING), Some("0"));
}

#[tokio::test]
async fn test_ignored_paths_bypass_the_gate() {
    let (app, store) = TestApp::new(window(1, 60));

    for _ in 0..3 {
        let response = app.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(header(&response, &X_RATE_LIMIT_LIMIT), None);
        assert_eq!(header(&response, &X_RATE_LIMIT_REMAINING), None);
        app.clock.advance(Duration::from_millis(1));
    }

    assert_eq!(app.get("/metrics").await.status_code(), StatusCode::OK);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_store_failure_grants_when_failing_open() {
    let app = TestApp::with_store(Arc::new(UnreachableStore), window(3, 60), true);

    let response = app.get("/api/v1/ping").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(header(&response, &X_RATE_LIMIT_ERR), Some("1"));
    assert_eq!(header(&response, &X_RATE_LIMIT_LIMIT), Some("3"));
    assert_eq!(header(&response, &X_RATE_LIMIT_REMAINING), Some("0"));
}

#[tokio::test]
async fn test_store_failure_rejects_when_failing_closed() {
    let app = TestApp::with_store(Arc::new(UnreachableStore), window(3, 60), false);

    let response = app.get("/api/v1/ping").await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, &X_RATE_LIMIT_ERR), Some("1"));
}
