//! Fixed-window rate limiting backed by the bounded cache.
//!
//! Each client gets a counter under `rate_limit:<client>` whose expiry is set
//! when the window opens. Later hits bump the count without touching the
//! expiry, so the window closes on schedule even under sustained traffic.

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cache::bounded::now_ms;
use crate::cache::{rate_limit_key, CachedValue, SharedCache};
use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::http::server::AppState;
use crate::model::RateLimitCounter;
use crate::observability::metrics;

/// Shared identity for clients that arrive without the forwarded-IP header.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow { count: u64 },
    Deny { count: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

pub struct RateLimiter {
    cache: SharedCache,
    enabled: bool,
    max_requests: u64,
    window: Duration,
    client_ip_header: String,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, cache: SharedCache) -> Self {
        Self {
            cache,
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            client_ip_header: config.client_ip_header.to_ascii_lowercase(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Client identity from the trusted header, or the shared sentinel.
    pub fn client_id(&self, headers: &HeaderMap) -> String {
        headers
            .get(self.client_ip_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string()
    }

    pub fn check(&self, client_id: &str) -> Decision {
        self.check_at(client_id, now_ms())
    }

    /// Count this request against the client's window as of `now_ms`.
    ///
    /// A denied request is not persisted, so the stored count never exceeds the cap.
    pub fn check_at(&self, client_id: &str, now_ms: u64) -> Decision {
        let cap = self.max_requests;
        let mut decision = Decision::Allow { count: 0 };

        self.cache
            .upsert_at(&rate_limit_key(client_id), self.window, now_ms, |previous| {
                let current = match previous {
                    Some(CachedValue::Counter(counter)) => counter.count,
                    _ => 0,
                };
                let next = current + 1;
                if next > cap {
                    decision = Decision::Deny { count: next };
                    CachedValue::Counter(RateLimitCounter { count: current })
                } else {
                    decision = Decision::Allow { count: next };
                    CachedValue::Counter(RateLimitCounter { count: next })
                }
            });

        decision
    }
}

/// Middleware: sweep the bounded cache, then gate the request.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let swept = state.cache.sweep();
    if swept > 0 {
        tracing::debug!(swept, "Expired cache entries removed");
    }

    let limiter = &state.rate_limiter;
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let client = limiter.client_id(request.headers());
    match limiter.check(&client) {
        Decision::Allow { .. } => next.run(request).await,
        Decision::Deny { count } => {
            tracing::warn!(client = %client, count, "Rate limit exceeded");
            metrics::record_rate_limited();
            AppError::RateLimited.into_response()
        }
    }
}
