//! Rate Limiting Middleware
//!
//! Tower layer that puts a [`Limiter`] in front of a handler. Every request
//! that is not bypassed gets the rate limit headers; requests over the limit
//! are answered with 429 without reaching the handler.
//!
//! When the limiter itself fails, the gate never surfaces a 5xx: it either
//! lets the request through (`grant_on_store_error = true`) or answers 429,
//! and flags the response with `X-Rate-Limit-Err: 1` in both cases.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use tower::{Layer, Service};

use crate::domain::limiter::Limiter;
use crate::domain::window::WindowConfig;
use crate::infrastructure::metrics::{self, Outcome};
use crate::shared::error::{ConfigurationError, ErrorResponse, LimiterError};

/// Capacity of the resolved window.
pub const X_RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-rate-limit-limit");
/// Quota left after this request, never negative.
pub const X_RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-rate-limit-remaining");
/// Window duration in seconds.
pub const X_RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-rate-limit-reset");
/// Present with value `1` only when the store call failed.
pub const X_RATE_LIMIT_ERR: HeaderName = HeaderName::from_static("x-rate-limit-err");

/// Message returned in the 429 body.
pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

/// Derives the bucket key for a request.
pub type KeyFn = Arc<dyn Fn(&Request<Body>) -> String + Send + Sync>;
/// Returns true for requests that skip rate limiting.
pub type IgnoreFn = Arc<dyn Fn(&Request<Body>) -> bool + Send + Sync>;
/// Per-request window override.
pub type RatesFn = Arc<dyn Fn(&Request<Body>) -> WindowConfig + Send + Sync>;
/// Diagnostic sink for limiter failures.
pub type ErrorLogFn = Arc<dyn Fn(&LimiterError, &str) + Send + Sync>;

// ============================================================================
// Gate Configuration
// ============================================================================

struct GateConfig {
    limiter: Arc<dyn Limiter>,
    key_fn: KeyFn,
    ignore_fn: Option<IgnoreFn>,
    rates_fn: Option<RatesFn>,
    default_window: WindowConfig,
    grant_on_store_error: bool,
    error_log: ErrorLogFn,
}

/// Builder for [`RateLimitGateLayer`].
///
/// Only the key function is required; everything else has a default:
/// no bypass, the 20 requests / 60 s window, fail-open, and limiter errors
/// logged through `tracing`.
pub struct RateLimitGateBuilder {
    limiter: Arc<dyn Limiter>,
    key_fn: Option<KeyFn>,
    ignore_fn: Option<IgnoreFn>,
    rates_fn: Option<RatesFn>,
    default_window: WindowConfig,
    grant_on_store_error: bool,
    error_log: Option<ErrorLogFn>,
}

impl RateLimitGateBuilder {
    fn new(limiter: Arc<dyn Limiter>) -> Self {
        Self {
            limiter,
            key_fn: None,
            ignore_fn: None,
            rates_fn: None,
            default_window: WindowConfig::default(),
            grant_on_store_error: true,
            error_log: None,
        }
    }

    pub fn key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&Request<Body>) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    pub fn ignore<F>(mut self, ignore_fn: F) -> Self
    where
        F: Fn(&Request<Body>) -> bool + Send + Sync + 'static,
    {
        self.ignore_fn = Some(Arc::new(ignore_fn));
        self
    }

    pub fn rates<F>(mut self, rates_fn: F) -> Self
    where
        F: Fn(&Request<Body>) -> WindowConfig + Send + Sync + 'static,
    {
        self.rates_fn = Some(Arc::new(rates_fn));
        self
    }

    pub fn default_window(mut self, window: WindowConfig) -> Self {
        self.default_window = window;
        self
    }

    pub fn grant_on_store_error(mut self, grant: bool) -> Self {
        self.grant_on_store_error = grant;
        self
    }

    pub fn error_log<F>(mut self, error_log: F) -> Self
    where
        F: Fn(&LimiterError, &str) + Send + Sync + 'static,
    {
        self.error_log = Some(Arc::new(error_log));
        self
    }

    /// Finish the gate.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::MissingKeyFn` when no key function was given.
    pub fn build(self) -> Result<RateLimitGateLayer, ConfigurationError> {
        let key_fn = self.key_fn.ok_or(ConfigurationError::MissingKeyFn)?;
        let error_log = self.error_log.unwrap_or_else(|| {
            Arc::new(|err: &LimiterError, description: &str| {
                tracing::error!(
                    error = %err,
                    store_unavailable = err.is_unavailable(),
                    "{}",
                    description
                );
            })
        });

        Ok(RateLimitGateLayer {
            config: Arc::new(GateConfig {
                limiter: self.limiter,
                key_fn,
                ignore_fn: self.ignore_fn,
                rates_fn: self.rates_fn,
                default_window: self.default_window,
                grant_on_store_error: self.grant_on_store_error,
                error_log,
            }),
        })
    }
}

/// Bypass predicate matching exact request paths.
pub fn ignore_paths<I, P>(paths: I) -> impl Fn(&Request<Body>) -> bool + Send + Sync + 'static
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
    move |request: &Request<Body>| paths.iter().any(|p| p == request.uri().path())
}

// ============================================================================
// Decisions
// ============================================================================

/// Header values for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u64,
    pub reset: u64,
    pub store_error: bool,
}

impl RateLimitHeaders {
    /// Write the rate limit headers into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if self.store_error {
            headers.insert(X_RATE_LIMIT_ERR, HeaderValue::from_static("1"));
        }
        headers.insert(X_RATE_LIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATE_LIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATE_LIMIT_RESET, HeaderValue::from(self.reset));
    }
}

/// What the gate does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward untouched: no headers, no store access.
    Bypass,
    /// Forward and add the headers to the handler's response.
    Allow(RateLimitHeaders),
    /// Answer 429 with the headers.
    Reject(RateLimitHeaders),
}

impl GateConfig {
    /// Everything that needs the request itself. Runs before any await so the
    /// request is never borrowed across one.
    fn resolve(&self, request: &Request<Body>) -> Option<(String, WindowConfig)> {
        if self.ignore_fn.as_ref().is_some_and(|ignore| ignore(request)) {
            return None;
        }

        let window = match &self.rates_fn {
            Some(rates) => rates(request),
            None => self.default_window,
        };
        let key = (self.key_fn)(request);
        Some((key, window))
    }

    async fn decide(&self, key: &str, window: WindowConfig) -> Decision {
        let (granted, remaining, store_error) = match self.limiter.grant(key, window).await {
            Ok(result) => (result.granted, result.remaining_for_header(), false),
            Err(err) => {
                (self.error_log)(&err, "failed to check if access is granted");
                metrics::record_decision(Outcome::StoreError);
                (self.grant_on_store_error, 0, true)
            }
        };

        let headers = RateLimitHeaders {
            limit: window.capacity(),
            remaining,
            reset: window.duration_secs(),
            store_error,
        };

        if granted {
            if !store_error {
                metrics::record_decision(Outcome::Granted);
            }
            Decision::Allow(headers)
        } else {
            if !store_error {
                metrics::record_decision(Outcome::Denied);
                tracing::warn!(
                    key = %key,
                    limit = window.capacity(),
                    window_secs = window.duration_secs(),
                    "Rate limit exceeded"
                );
            }
            Decision::Reject(headers)
        }
    }
}

/// Outcome for a request that went through the limiter.
#[derive(Debug, Clone, Copy)]
enum Decision {
    Allow(RateLimitHeaders),
    Reject(RateLimitHeaders),
}

impl From<Decision> for Verdict {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow(headers) => Verdict::Allow(headers),
            Decision::Reject(headers) => Verdict::Reject(headers),
        }
    }
}

/// Create a 429 Too Many Requests response.
fn create_rate_limit_response(headers: &RateLimitHeaders) -> Response<Body> {
    let body = ErrorResponse {
        code: StatusCode::TOO_MANY_REQUESTS.as_u16(),
        message: RATE_LIMIT_EXCEEDED.to_string(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    headers.apply(response.headers_mut());
    response
}

// ============================================================================
// Tower Layer
// ============================================================================

/// Layer that rate limits requests through a [`Limiter`].
#[derive(Clone)]
pub struct RateLimitGateLayer {
    config: Arc<GateConfig>,
}

impl RateLimitGateLayer {
    /// Start configuring a gate around `limiter`.
    pub fn builder(limiter: Arc<dyn Limiter>) -> RateLimitGateBuilder {
        RateLimitGateBuilder::new(limiter)
    }

    /// Run the gate's decision for `request` without forwarding it.
    pub async fn check(&self, request: &Request<Body>) -> Verdict {
        match self.config.resolve(request) {
            Some((key, window)) => self.config.decide(&key, window).await.into(),
            None => {
                metrics::record_decision(Outcome::Bypassed);
                Verdict::Bypass
            }
        }
    }
}

impl<S> Layer<S> for RateLimitGateLayer {
    type Service = RateLimitGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitGate {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Middleware service that enforces the rate limit
#[derive(Clone)]
pub struct RateLimitGate<S> {
    inner: S,
    config: Arc<GateConfig>,
}

impl<S> Service<Request<Body>> for RateLimitGate<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();
        let resolved = config.resolve(&request);

        Box::pin(async move {
            let Some((key, window)) = resolved else {
                metrics::record_decision(Outcome::Bypassed);
                return inner.call(request).await;
            };

            match config.decide(&key, window).await {
                Decision::Reject(headers) => Ok(create_rate_limit_response(&headers)),
                Decision::Allow(headers) => {
                    let mut response = inner.call(request).await?;
                    headers.apply(response.headers_mut());
                    Ok(response)
                }
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
