//! Middleware
//!
//! Tower middleware for request processing.

pub mod client_ip;
pub mod logging;
pub mod rate_limit;

pub use client_ip::{first_public_ip, first_valid_ip, ip_bucket, ip_bucket_with_filter};
pub use rate_limit::{
    ignore_paths,
    RateLimitGate,
    RateLimitGateBuilder,
    RateLimitGateLayer,
    RateLimitHeaders,
    Verdict,
    X_RATE_LIMIT_ERR,
    X_RATE_LIMIT_LIMIT,
    X_RATE_LIMIT_REMAINING,
    X_RATE_LIMIT_RESET,
};
