//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Window stores (Redis, in-process)
//! - Prometheus metrics

pub mod cache;
pub mod metrics;
