//! Prometheus Metrics Module
//!
//! Provides rate limiter metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Gate decisions by outcome (granted, denied, bypassed, store_error)
//! - Store transaction latency histograms

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Gate decision counter - one increment per request seen by the gate
pub static DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("decisions_total", "Rate limit decisions by outcome").namespace("ratelimit"),
        &["outcome"],
    )
    .expect("Failed to create DECISIONS_TOTAL metric")
});

/// Store transaction latency histogram - tracks grant round-trips in seconds
pub static STORE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];
    HistogramVec::new(
        HistogramOpts::new(
            "store_duration_seconds",
            "Sliding window store transaction latency in seconds",
        )
        .namespace("ratelimit")
        .buckets(buckets),
        &["result"],
    )
    .expect("Failed to create STORE_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(DECISIONS_TOTAL.clone()))
        .expect("Failed to register DECISIONS_TOTAL");
    registry
        .register(Box::new(STORE_DURATION_SECONDS.clone()))
        .expect("Failed to register STORE_DURATION_SECONDS");
}

/// Gate outcomes, used as the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Granted,
    Denied,
    Bypassed,
    StoreError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Granted => "granted",
            Outcome::Denied => "denied",
            Outcome::Bypassed => "bypassed",
            Outcome::StoreError => "store_error",
        }
    }
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record a gate decision
pub fn record_decision(outcome: Outcome) {
    DECISIONS_TOTAL.with_label_values(&[outcome.as_str()]).inc();
}

/// Helper to record a store round-trip
pub fn record_store_call(ok: bool, duration_secs: f64) {
    let result = if ok { "ok" } else { "error" };
    STORE_DURATION_SECONDS
        .with_label_values(&[result])
        .observe(duration_secs);
}
