//! Rate limiter for preventing brute force attacks

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Tracked keys above which `record` sweeps out expired windows
const EVICTION_THRESHOLD: usize = 1024;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed inside one window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
}

impl RateLimiterConfig {
    /// Failed logins: 10 per 15 minutes
    pub fn login() -> Self {
        Self {
            max_attempts: 10,
            window_seconds: 15 * 60,
        }
    }

    /// Contact form submissions: 5 per hour
    pub fn contact() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 60 * 60,
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::login()
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Number of attempts in the current window
    attempts: u32,
    /// Start of the current window
    window_start: Instant,
}

/// Fixed-window attempt counter keyed by an arbitrary string (usually the
/// client IP)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds)
    }

    /// Whether `key` has used up its attempts, without counting a new one
    pub async fn is_blocked(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if now.duration_since(entry.window_start) >= self.window() => {
                entries.remove(key);
                false
            }
            Some(entry) => entry.attempts >= self.config.max_attempts,
            None => false,
        }
    }

    /// Count one attempt for `key`
    pub async fn record(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = self.window();

        if entries.len() >= EVICTION_THRESHOLD && !entries.contains_key(key) {
            Self::evict_expired(&mut entries, now, window);
        }

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        entry.attempts += 1;
        if entry.attempts == self.config.max_attempts {
            info!(
                key = %key,
                window_seconds = self.config.window_seconds,
                "Rate limit reached"
            );
        }
    }

    /// Count an attempt and report whether it was allowed
    pub async fn is_allowed(&self, key: &str) -> bool {
        if self.is_blocked(key).await {
            return false;
        }
        self.record(key).await;
        true
    }

    /// Drop every entry whose window has elapsed
    pub async fn purge_expired(&self) {
        let mut entries = self.entries.lock().await;
        Self::evict_expired(&mut entries, Instant::now(), self.window());
    }

    fn evict_expired(
        entries: &mut HashMap<String, RateLimiterEntry>,
        now: Instant,
        window: Duration,
    ) {
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
        debug!(evicted = before - entries.len(), "Expired rate limit entries evicted");
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Forget all attempts for `key`
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
