//! Rate limiter for preventing brute force login attempts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    /// Neither the window nor a ban still holds anything for this key
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.ban_expires.is_none_or(|ban_expires| now >= ban_expires)
            && now.duration_since(self.window_start) >= window
    }
}

#[derive(Debug)]
struct RateLimiterState {
    entries: HashMap<String, RateLimiterEntry>,
    last_sweep: Instant,
}

/// Keyed attempt counter with a temporary ban once the limit is hit
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RateLimiterState {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        // Evict expired keys at most once per window
        if now.duration_since(state.last_sweep) >= window {
            let before = state.entries.len();
            state.entries.retain(|_, entry| !entry.is_stale(now, window));
            state.last_sweep = now;
            let evicted = before - state.entries.len();
            if evicted > 0 {
                debug!("Evicted {} expired rate limit keys", evicted);
            }
        }

        let entry = state
            .entries
            .entry(key.to_string())
            .or_insert(RateLimiterEntry {
                attempts: 0,
                window_start: now,
                ban_expires: None,
            });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.ban_expires = None;
            entry.window_start = now;
        }

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget all attempts for `key`, lifting any ban
    pub async fn reset(&self, key: &str) {
        if self.state.lock().await.entries.remove(key).is_some() {
            info!("Reset rate limit for key {}", key);
        }
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}
