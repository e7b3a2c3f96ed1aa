//! Client IP bucket keys.
//!
//! Generates rate limit bucket keys of the form `{prefix}-{ip}`.
//!
//! Lookup order:
//! 1. `X-Forwarded-For`, the first address accepted by the filter
//!    (by default, the first public address in the chain)
//! 2. `X-Real-IP`
//! 3. The socket peer address (`ConnectInfo`)
//! 4. `unknown`, shared by every request without an address
//!
//! # Security Considerations
//!
//! Forwarding headers are client-controlled unless a trusted proxy
//! overwrites them. Deployed directly on the internet, clients can rotate
//! spoofed addresses to escape their bucket.

use std::net::{IpAddr, SocketAddr};

use axum::{body::Body, extract::ConnectInfo, http::Request};

use crate::infrastructure::cache::keys;

/// Key used when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Picks the client address out of an `X-Forwarded-For` chain.
pub type ForwardedFilter = fn(&[&str]) -> Option<String>;

/// Bucket key generator based on the client's IP address, taking the first
/// public address found in `X-Forwarded-For`.
pub fn ip_bucket(prefix: impl Into<String>) -> impl Fn(&Request<Body>) -> String + Send + Sync + 'static {
    ip_bucket_with_filter(prefix, first_public_ip)
}

/// Like [`ip_bucket`] with a custom choice of address from the forwarded chain.
pub fn ip_bucket_with_filter(
    prefix: impl Into<String>,
    filter: ForwardedFilter,
) -> impl Fn(&Request<Body>) -> String + Send + Sync + 'static {
    let prefix = prefix.into();
    move |request: &Request<Body>| keys::bucket(&prefix, client_ip(request, filter))
}

/// Resolve the client address for `request`.
pub fn client_ip(request: &Request<Body>, filter: ForwardedFilter) -> String {
    let headers = request.headers();

    if let Some(forwarded_for) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        let chain: Vec<&str> = forwarded_for
            .split(',')
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .collect();
        if let Some(ip) = filter(&chain) {
            return ip;
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        if let Ok(ip) = real_ip.trim().parse::<IpAddr>() {
            return ip.to_string();
        }
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => {
            tracing::debug!("Could not determine client address for rate limiting");
            UNKNOWN_IP.to_string()
        }
    }
}

/// Default forwarded-chain filter: first address that is not private,
/// loopback, link-local or unspecified.
pub fn first_public_ip(chain: &[&str]) -> Option<String> {
    chain
        .iter()
        .filter_map(|candidate| candidate.parse::<IpAddr>().ok())
        .find(is_public)
        .map(|ip| ip.to_string())
}

/// Forwarded-chain filter that trusts the left-most valid address.
pub fn first_valid_ip(chain: &[&str]) -> Option<String> {
    chain
        .iter()
        .find_map(|candidate| candidate.parse::<IpAddr>().ok())
        .map(|ip| ip.to_string())
}

fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link-local
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}
