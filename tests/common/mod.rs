//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderName;
use axum_test::{TestResponse, TestServer};

use ratelimit_gate::application::services::SlidingWindowLimiter;
use ratelimit_gate::domain::{ManualClock, WindowConfig, WindowStore, WindowUpdate};
use ratelimit_gate::infrastructure::cache::MemoryWindowStore;
use ratelimit_gate::presentation::http::routes;
use ratelimit_gate::presentation::middleware::{ignore_paths, ip_bucket, RateLimitGateLayer};
use ratelimit_gate::shared::error::LimiterError;
use ratelimit_gate::startup::AppState;

/// 2018-01-01T01:00:00Z
pub const T0: i64 = 1_514_768_400_000_000_000;

/// Paths the test gate never rate limits.
pub const IGNORED: [&str; 4] = ["/health", "/health/live", "/health/ready", "/metrics"];

/// Store that is always unreachable.
pub struct UnreachableStore;

#[async_trait]
impl WindowStore for UnreachableStore {
    async fn record(&self, _key: &str, _update: WindowUpdate) -> Result<Vec<String>, LimiterError> {
        Err(LimiterError::Timeout(Duration::from_millis(500)))
    }

    async fn ping(&self) -> Result<(), LimiterError> {
        Err(LimiterError::Timeout(Duration::from_millis(500)))
    }
}

/// Test application builder
pub struct TestApp {
    pub server: TestServer,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    /// Application over a fresh in-process store.
    pub fn new(window: WindowConfig) -> (Self, Arc<MemoryWindowStore>) {
        let store = Arc::new(MemoryWindowStore::new());
        let app = Self::with_store(store.clone(), window, true);
        (app, store)
    }

    /// Application over any store with the given failure policy.
    pub fn with_store(
        store: Arc<dyn WindowStore>,
        window: WindowConfig,
        grant_on_store_error: bool,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let limiter = SlidingWindowLimiter::new(store.clone()).with_clock(clock.clone());

        let gate = RateLimitGateLayer::builder(Arc::new(limiter))
            .key_fn(ip_bucket(unique_prefix()))
            .ignore(ignore_paths(IGNORED))
            .default_window(window)
            .grant_on_store_error(grant_on_store_error)
            .build()
            .unwrap();

        let state = AppState {
            store,
            backend: "memory",
        };

        let server = TestServer::new(routes::create_router(state, gate)).unwrap();
        Self { server, clock }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.server.get(uri).await
    }
}

/// Read a response header as a string.
pub fn header<'a>(response: &'a TestResponse, name: &HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Generate a unique bucket namespace
pub fn unique_prefix() -> String {
    format!("test-{}", &uuid::Uuid::new_v4().to_string()[..8])
}
