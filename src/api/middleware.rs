//! API Middleware (Rate Limiting, Logging)

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{ApiError, ApiResponse};

/// Rate limiter configuration
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // scans fan out to every chain, so keep this modest
            requests_per_window: 30,
            window_duration: Duration::from_secs(60),
        }
    }
}

/// In-memory fixed-window rate limiter keyed by client
pub struct RateLimiter {
    requests: DashMap<String, (u32, Instant)>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: DashMap::new(),
            config,
        }
    }

    /// Check if request is allowed, returns (allowed, remaining, reset_seconds)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) > self.config.window_duration {
            entry.0 = 0;
            entry.1 = now;
        }

        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if entry.0 >= self.config.requests_per_window {
            return (false, 0, reset_secs);
        }

        entry.0 += 1;
        let remaining = self.config.requests_per_window - entry.0;
        (true, remaining, reset_secs)
    }

    /// Drop windows that ended long ago
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        self.requests.retain(|_, (_, started)| {
            now.duration_since(*started) < self.config.window_duration * 2
        });
        before - self.requests.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

// Global rate limiter instance
lazy_static::lazy_static! {
    pub static ref RATE_LIMITER: Arc<RateLimiter> = Arc::new(RateLimiter::default());
}

/// Periodically prune the global rate limiter
pub fn start_cleanup_task() {
    tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = RATE_LIMITER.cleanup();
            if removed > 0 {
                debug!("🧹 Rate limiter cleanup: {} stale clients removed", removed);
            }
        }
    });
}

fn is_health(path: &str) -> bool {
    path == "/health" || path == "/v1/health"
}

/// Client key: forwarded IP headers, else "unknown"
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(headers: HeaderMap, request: Request, next: Next) -> Response {
    if is_health(request.uri().path()) {
        return next.run(request).await;
    }

    let rate_key = client_key(&headers);
    let (allowed, remaining, reset) = RATE_LIMITER.check(&rate_key);

    if !allowed {
        warn!(key = %rate_key, "Rate limit exceeded");
        let body = Json(ApiResponse::error(ApiError::rate_limited(reset), 0.0));
        return (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", remaining.into());
    headers.insert("X-RateLimit-Reset", reset.into());

    response
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
