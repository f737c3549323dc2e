//! # Rate Limiter Module
//!
//! This module provides the rate limiter that spaces outbound AI calls.
//! Limiters are plain owned objects behind the [`RateLimiter`] trait: one
//! instance is shared (through `Arc`) by every caller that must be spaced
//! together, and tests can build as many independent limiters as they need.
//!
//! The limiter coordinates tasks of one process only.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Gate passed before every outbound AI request
#[async_trait]
pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Wait until the next request may be issued, then claim the slot
    async fn acquire(&self);
}

/// Enforces a minimum interval between consecutive acquisitions
///
/// # Thread Safety
///
/// The last-request instant is guarded by an async mutex that stays locked
/// while the remaining wait is computed, slept and the instant updated, so
/// concurrent acquirers are served one at a time.
#[derive(Debug)]
pub struct IntervalRateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl IntervalRateLimiter {
    /// Create a limiter that spaces acquisitions by `min_interval`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingredient_scaler::rate_limiter::IntervalRateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = IntervalRateLimiter::new(Duration::from_secs(2));
    /// assert_eq!(limiter.min_interval(), Duration::from_secs(2));
    /// ```
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[async_trait]
impl RateLimiter for IntervalRateLimiter {
    async fn acquire(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limiter delaying AI request");
                sleep(wait).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}
