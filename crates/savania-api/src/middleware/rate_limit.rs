//! # Public Route Rate Limiting
//!
//! Fixed-window counter per client address, applied to the public routes
//! (contact form, security reports, login). Clients without an address
//! share the `anonymous` bucket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::AppError;
use crate::extractors::client_ip;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: crate::state::DEFAULT_RATE_LIMIT,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count a request from `key` at `now`; false once the window is full.
    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock();
        buckets.retain(|_, b| now.duration_since(b.window_start) < self.config.window);

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });
        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }

    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }
}

/// Middleware that enforces per-client rate limits.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = client_ip(request.headers()).unwrap_or_else(|| "anonymous".to_string());
        if !limiter.check(&key) {
            tracing::warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
            return AppError::RateLimited.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests: max,
            window: Duration::from_secs(60),
        })
    }

    #[test]
    fn window_fills_then_resets() {
        let l = limiter(2);
        let t0 = Instant::now();
        assert!(l.check_at("a", t0));
        assert!(l.check_at("a", t0));
        assert!(!l.check_at("a", t0 + Duration::from_secs(10)));
        assert!(l.check_at("b", t0));
        assert!(l.check_at("a", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn zero_limit_blocks_everything() {
        assert!(!limiter(0).check("a"));
    }
}
