use std::time::{Duration, Instant};

/// Fixed-window limit settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Messages accepted per window
    pub max_messages: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        use crate::game::constants::rate_limit::{DEFAULT_MAX_MESSAGES, DEFAULT_WINDOW_MS};

        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            window: Duration::from_millis(DEFAULT_WINDOW_MS),
        }
    }
}

/// Errors from rate limit checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded")]
    Exceeded,
}

/// Per-session fixed-window message counter
#[derive(Debug)]
pub struct MessageRateLimiter {
    config: RateLimitConfig,
    message_count: u32,
    window_start: Instant,
    violations: u64,
}

impl MessageRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            message_count: 0,
            window_start: Instant::now(),
            violations: 0,
        }
    }

    /// Count one inbound message
    pub fn check(&mut self) -> Result<(), RateLimitError> {
        self.check_at(Instant::now())
    }

    /// Count one inbound message received at `now`
    pub fn check_at(&mut self, now: Instant) -> Result<(), RateLimitError> {
        // Reset window if expired
        if now.saturating_duration_since(self.window_start) >= self.config.window {
            self.window_start = now;
            self.message_count = 0;
        }

        self.message_count = self.message_count.saturating_add(1);

        if self.message_count > self.config.max_messages {
            self.violations += 1;
            Err(RateLimitError::Exceeded)
        } else {
            Ok(())
        }
    }

    /// Messages rejected over the limiter's lifetime
    pub fn violations(&self) -> u64 {
        self.violations
    }
}
