//! Uniform per-client rate limiting
//!
//! A fixed-window counter keyed by client IP, applied to every route. Each
//! client gets [`MAX_REQUESTS`] requests per [`WINDOW_SECS`]-second window;
//! the request that exceeds the threshold (and every further request in the
//! same window) gets 429.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

/// Requests allowed per client per window
pub const MAX_REQUESTS: u32 = 50;
/// Window length in seconds
pub const WINDOW_SECS: u64 = 60;

struct IpEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    /// IP -> current window entry
    inner: Arc<Mutex<HashMap<String, IpEntry>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, ip: &str) -> bool {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        let entry = map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start).as_secs() >= WINDOW_SECS {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= MAX_REQUESTS
    }

    /// Remove entries whose window started more than 5 minutes ago
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let cutoff = std::time::Duration::from_secs(300);
        let now = Instant::now();

        map.retain(|_, entry| now.duration_since(entry.window_start) < cutoff);
    }
}

/// Extract client IP: X-Forwarded-For header first (proxy/LB), then peer address.
fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    // Fallback: peer address from extensions (ConnectInfo)
    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Rate limit middleware applied uniformly to all endpoints
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = extract_ip(&request);
    if !state.rate_limiter.check(&ip).await {
        return Err(AppError::new(ErrorCode::RateLimited));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_enforced() {
        let limiter = RateLimiter::new();
        for _ in 0..MAX_REQUESTS {
            assert!(limiter.check("10.0.0.1").await);
        }
        // 51st request in the same window is rejected
        assert!(!limiter.check("10.0.0.1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = RateLimiter::new();
        for _ in 0..=MAX_REQUESTS {
            let _ = limiter.check("10.0.0.2").await;
        }
        assert!(!limiter.check("10.0.0.2").await);

        tokio::time::advance(std::time::Duration::from_secs(WINDOW_SECS + 1)).await;
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..=MAX_REQUESTS {
            let _ = limiter.check("10.0.0.3").await;
        }
        assert!(!limiter.check("10.0.0.3").await);
        assert!(limiter.check("10.0.0.4").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_idle_entries() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("10.0.0.5").await);

        tokio::time::advance(std::time::Duration::from_secs(301)).await;
        limiter.cleanup().await;

        let map = limiter.inner.lock().await;
        assert!(map.is_empty());
    }
}
