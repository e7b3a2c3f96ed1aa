//! # Rate Limit Gate
//!
//! Demo server running the sliding window rate limiter in front of a
//! sample API.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Redis client (or the in-process store)
//! - HTTP server

use anyhow::Result;
use tracing::info;

use ratelimit_gate::config::Settings;
use ratelimit_gate::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    ratelimit_gate::telemetry::init_tracing();

    info!("Starting rate limit gate...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        redis_enabled = settings.redis.enabled,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
