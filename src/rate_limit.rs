//! Generic sliding-window rate limiter, reused across the login path, the
//! external API, and webhook intake. Keys are "action:identity" strings.

use std::collections::HashMap;
use std::env;
use std::sync::Mutex;
use std::time::Instant;

/// Configurable rate limit values, all read from environment variables with
/// sensible defaults (spec §7: auth failures get "rate-limit on repeated").
pub struct RateLimitConfig {
    /// Failed login attempts per email per 15 minutes.
    pub login_max: usize,
    pub login_window_secs: u64,
    /// Password-reset requests per email per hour.
    pub password_reset_max: usize,
    pub password_reset_window_secs: u64,
    /// Manual scrape triggers per dealership per hour.
    pub manual_scrape_max: usize,
    pub manual_scrape_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_max: 10,
            login_window_secs: 900,
            password_reset_max: 5,
            password_reset_window_secs: 3600,
            manual_scrape_max: 20,
            manual_scrape_window_secs: 3600,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = env::var("RATE_LIMIT_LOGIN")
            && let Ok(n) = val.parse::<usize>()
        {
            config.login_max = n;
        }
        if let Ok(val) = env::var("RATE_LIMIT_PASSWORD_RESET")
            && let Ok(n) = val.parse::<usize>()
        {
            config.password_reset_max = n;
        }
        if let Ok(val) = env::var("RATE_LIMIT_MANUAL_SCRAPE")
            && let Ok(n) = val.parse::<usize>()
        {
            config.manual_scrape_max = n;
        }
        config
    }
}

pub struct RateLimiter {
    limits: Mutex<HashMap<String, Vec<Instant>>>,
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub allowed: bool,
    pub limit: usize,
    pub remaining: usize,
    /// Seconds until the oldest request in the window expires (0 if capacity remains).
    pub retry_after_secs: u64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            limits: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str, max: usize, window_secs: u64) -> bool {
        self.check_with_info(key, max, window_secs).allowed
    }

    pub fn check_with_info(&self, key: &str, max: usize, window_secs: u64) -> RateLimitInfo {
        let mut limits = self.limits.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let window = std::time::Duration::from_secs(window_secs);

        let entries = limits.entry(key.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < window);

        if entries.len() >= max {
            let oldest = match entries.iter().min() {
                Some(t) => *t,
                None => {
                    return RateLimitInfo {
                        allowed: false,
                        remaining: 0,
                        limit: max,
                        retry_after_secs: 1,
                    }
                }
            };
            let elapsed = now.duration_since(oldest);
            let retry_after = if elapsed < window {
                (window - elapsed).as_secs() + 1
            } else {
                1
            };
            return RateLimitInfo {
                allowed: false,
                limit: max,
                remaining: 0,
                retry_after_secs: retry_after,
            };
        }

        entries.push(now);
        let remaining = max - entries.len();
        RateLimitInfo {
            allowed: true,
            limit: max,
            remaining,
            retry_after_secs: 0,
        }
    }
}
