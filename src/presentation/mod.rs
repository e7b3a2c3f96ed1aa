//! Presentation Layer
//!
//! HTTP routes and the rate limiting middleware.

pub mod http;
pub mod middleware;
