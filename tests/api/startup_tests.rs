//! Startup tests against a Redis server that is not there.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;

use ratelimit_gate::config::{RateLimitSettings, RedisSettings, ServerSettings, Settings};
use ratelimit_gate::presentation::http::routes;
use ratelimit_gate::presentation::middleware::{X_RATE_LIMIT_ERR, X_RATE_LIMIT_LIMIT};
use ratelimit_gate::startup::{self, AppState, Application};

use crate::common::header;

/// Nothing listens on port 1.
const UNREACHABLE_REDIS: &str = "redis://127.0.0.1:1";

fn unreachable_redis_settings(grant_on_store_error: bool) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        redis: RedisSettings {
            url: UNREACHABLE_REDIS.into(),
            enabled: true,
            command_timeout_ms: 2_000,
            key_expiration_secs: 86_400,
        },
        rate_limit: RateLimitSettings {
            capacity: 5,
            window_secs: 60,
            grant_on_store_error,
            key_prefix: "rl".into(),
            ignore_paths: vec!["/health".into()],
        },
        environment: "test".into(),
    }
}

fn server(settings: &Settings) -> TestServer {
    let (store, backend) = startup::create_store(settings).unwrap();
    let limiter = startup::create_limiter(settings, store.clone());
    let gate = startup::create_gate(settings, Arc::new(limiter)).unwrap();

    TestServer::new(routes::create_router(AppState { store, backend }, gate)).unwrap()
}

#[tokio::test]
async fn test_application_starts_without_redis() {
    let started = Instant::now();
    let application = Application::build(unreachable_redis_settings(true)).await;

    assert!(application.is_ok());
    assert!(started.elapsed().as_secs() < 2);
}

#[tokio::test]
async fn test_unreachable_redis_grants_when_failing_open() {
    let server = server(&unreachable_redis_settings(true));

    let response = server.get("/api/v1/ping").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(header(&response, &X_RATE_LIMIT_ERR), Some("1"));
    assert_eq!(header(&response, &X_RATE_LIMIT_LIMIT), Some("5"));
}

#[tokio::test]
async fn test_unreachable_redis_rejects_when_failing_closed() {
    let server = server(&unreachable_redis_settings(false));

    let response = server.get("/api/v1/ping").await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, &X_RATE_LIMIT_ERR), Some("1"));
}

#[tokio::test]
async fn test_readiness_reports_unreachable_redis() {
    let server = server(&unreachable_redis_settings(true));

    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}
