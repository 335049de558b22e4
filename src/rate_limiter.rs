//! Per-client request throttling with an approximate sliding window
//!
//! Each client key owns one [`ClientWindow`]. A window admits `limit` requests;
//! once `interval` has passed since the window opened, the next request opens a
//! fresh window. Two adjacent windows can therefore admit up to `2 × limit`
//! requests around the boundary, in exchange for O(1) bookkeeping per request.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

/// Request bookkeeping for a single client
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    /// Requests admitted in the current window
    request_count: u32,
    /// When the current window opened
    window_start: Instant,
}

impl ClientWindow {
    fn open(now: Instant) -> Self {
        Self {
            request_count: 1,
            window_start: now,
        }
    }

    /// Seconds until this window expires, rounded up and never zero
    fn retry_after(&self, interval: Duration, now: Instant) -> u64 {
        let expires = self.window_start + interval;
        let remaining = expires.saturating_duration_since(now);
        remaining.as_secs_f64().ceil().max(1.0) as u64
    }
}

/// Sliding-window rate limiter keyed by client
///
/// Mutations happen under one mutex, so concurrent requests from the same
/// client never lose or double-count an increment. The lock is only held for
/// the map lookup and counter update.
pub struct RateLimiter {
    /// Per-client windows (never evicted)
    windows: Mutex<HashMap<String, ClientWindow>>,
    /// Configuration
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Binary admission decision for one request
    pub async fn admit(&self, client_key: &str) -> bool {
        self.check(client_key).await.is_none()
    }

    /// Record a request from `client_key`
    ///
    /// Returns `None` when the request is admitted, or the number of seconds
    /// until the client's window resets when it is rejected.
    pub async fn check(&self, client_key: &str) -> Option<u64> {
        self.check_at(client_key, Instant::now()).await
    }

    pub(crate) async fn check_at(&self, client_key: &str, now: Instant) -> Option<u64> {
        if !self.config.enabled || self.is_exempt(client_key) {
            return None;
        }

        let mut windows = self.windows.lock().await;

        let Some(window) = windows.get_mut(client_key) else {
            windows.insert(client_key.to_string(), ClientWindow::open(now));
            return None;
        };

        if now.saturating_duration_since(window.window_start) > self.config.interval {
            *window = ClientWindow::open(now);
            return None;
        }

        if window.request_count < self.config.limit {
            window.request_count += 1;
            return None;
        }

        Some(window.retry_after(self.config.interval, now))
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }

    fn is_exempt(&self, client_key: &str) -> bool {
        self.config.exempt_clients.iter().any(|c| c == client_key)
    }
}
