//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::SlidingWindowLimiter;
use crate::config::Settings;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::limiter::{Limiter, WindowStore};
use crate::infrastructure::cache::{self, MemoryWindowStore, RedisWindowStore};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{ignore_paths, ip_bucket, logging, RateLimitGateLayer};

/// How often the in-process store drops expired buckets.
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WindowStore>,
    /// Store backend name reported by readiness ("redis" or "memory")
    pub backend: &'static str,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let (store, backend) = create_store(&settings)?;

        let limiter: Arc<dyn Limiter> = Arc::new(create_limiter(&settings, store.clone()));
        let gate = create_gate(&settings, limiter)?;

        let state = AppState { store, backend };

        handlers::health::init_server_start();

        // Build router with middleware
        let router = routes::create_router(state, gate).layer(logging::create_trace_layer());

        // Bind to address
        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Create the bucket store selected by `redis.enabled`.
///
/// Never waits on Redis: the connection is dialed in the background and by
/// the first request, and failures until then follow the gate's store error
/// policy.
pub fn create_store(settings: &Settings) -> Result<(Arc<dyn WindowStore>, &'static str)> {
    if settings.redis.enabled {
        let redis = cache::create_redis_client(&settings.redis)?;
        let store = RedisWindowStore::new(redis);
        spawn_connect_task(store.clone());
        Ok((Arc::new(store) as Arc<dyn WindowStore>, "redis"))
    } else {
        tracing::warn!("Redis disabled; rate limit buckets are local to this process");
        let store = Arc::new(MemoryWindowStore::new());
        spawn_purge_task(store.clone());
        Ok((store as Arc<dyn WindowStore>, "memory"))
    }
}

/// Dial Redis ahead of the first request.
fn spawn_connect_task(store: RedisWindowStore) {
    tokio::spawn(async move {
        if let Err(e) = store.connection().await {
            tracing::warn!(
                error = %e,
                "Redis unreachable at startup; requests follow the store error policy until it connects"
            );
        }
    });
}

/// Periodically drop buckets that nobody touched within their TTL.
fn spawn_purge_task(store: Arc<MemoryWindowStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired(SystemClock.now_nanos());
            if purged > 0 {
                tracing::debug!(purged, remaining = store.len(), "Purged expired buckets");
            }
        }
    });
}

/// Sliding window limiter configured from settings.
pub fn create_limiter(settings: &Settings, store: Arc<dyn WindowStore>) -> SlidingWindowLimiter {
    let limiter =
        SlidingWindowLimiter::new(store).with_key_expiration(settings.redis.key_expiration());
    match settings.redis.command_timeout() {
        Some(timeout) => limiter.with_timeout(timeout),
        None => limiter,
    }
}

/// Rate limit gate keyed by client IP, bypassing the configured paths.
pub fn create_gate(settings: &Settings, limiter: Arc<dyn Limiter>) -> Result<RateLimitGateLayer> {
    let rate_limit = &settings.rate_limit;
    let gate = RateLimitGateLayer::builder(limiter)
        .key_fn(ip_bucket(rate_limit.key_prefix.clone()))
        .ignore(ignore_paths(rate_limit.ignore_paths.clone()))
        .default_window(rate_limit.window()?)
        .grant_on_store_error(rate_limit.grant_on_store_error)
        .build()?;

    tracing::info!(
        capacity = rate_limit.capacity,
        window_secs = rate_limit.window_secs,
        grant_on_store_error = rate_limit.grant_on_store_error,
        "Rate limit gate configured"
    );
    Ok(gate)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
