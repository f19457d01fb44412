use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::errors::ServiceError;

/// Fixed-window request counter for one client key.
#[derive(Clone, Copy, Debug)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// In-memory fixed-window rate limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    requests_per_window: u32,
    window: Duration,
    entries: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn new(requests_per_window: u32, window: Duration) -> Self {
        Self {
            requests_per_window,
            window,
            entries: DashMap::new(),
        }
    }

    /// Records a hit for `key` and reports whether it is within the limit.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= self.requests_per_window
    }

    /// Drops expired windows so the map does not grow without bound.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.window;
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
    }
}

fn client_key(request: &Request) -> String {
    // Prefer the bearer identity so each account gets its own window;
    // fall back to the client address for anonymous traffic.
    if let Some(auth) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        return format!("auth:{}", auth);
    }
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        return format!("ip:{}", forwarded.split(',').next().unwrap_or(forwarded));
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }
    "anonymous".to_string()
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if !limiter.check(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return ServiceError::RateLimitExceeded.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("client-a"));
        assert!(limiter.check("client-a"));
        assert!(limiter.check("client-a"));
        assert!(!limiter.check("client-a"));
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("client-a"));
        assert!(!limiter.check("client-a"));
        assert!(limiter.check("client-b"));
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("client-a"));
        assert!(!limiter.check("client-a"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check("client-a"));
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        limiter.check("client-a");
        std::thread::sleep(Duration::from_millis(15));
        limiter.sweep();
        assert!(limiter.entries.is_empty());
    }
}
