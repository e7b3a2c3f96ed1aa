//! # Rate Limit Gate
//!
//! Distributed sliding-window rate limiting for HTTP services:
//! - A `SlidingWindowLimiter` counting requests per bucket in a shared
//!   sorted-set store (Redis), one atomic transaction per request
//! - A `RateLimitGateLayer` tower middleware that applies the limiter,
//!   sets `X-Rate-Limit-*` headers and answers 429 when a bucket is full
//! - An explicit fail-open / fail-closed policy for store failures
//!
//! ## Module Structure
//!
//! ```text
//! ratelimit_gate/
//! +-- config/         Configuration management
//! +-- domain/         Window config, grant results, Limiter/WindowStore/Clock traits
//! +-- application/    Sliding window limiter
//! +-- infrastructure/ Redis and in-process stores, metrics
//! +-- presentation/   Rate limit gate, client IP keys, routes
//! +-- shared/         Error types
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratelimit_gate::application::services::SlidingWindowLimiter;
//! use ratelimit_gate::infrastructure::cache::RedisWindowStore;
//! use ratelimit_gate::presentation::middleware::{ip_bucket, RateLimitGateLayer};
//!
//! let limiter = SlidingWindowLimiter::new(Arc::new(RedisWindowStore::new(redis)));
//! let gate = RateLimitGateLayer::builder(Arc::new(limiter))
//!     .key_fn(ip_bucket("api"))
//!     .grant_on_store_error(true)
//!     .build()?;
//! let app = Router::new().route("/", get(handler)).layer(gate);
//! ```

// Configuration module
pub mod config;

// Domain layer - Window rules and traits
pub mod domain;

// Application layer - Limiter service
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP middleware and handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
