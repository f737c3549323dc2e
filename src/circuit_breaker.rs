//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for AI scaling calls.
//! When the provider fails repeatedly, the breaker "opens" and further calls
//! skip the network entirely, going straight to the deterministic scaler until
//! the reset timeout has elapsed.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::scaling_config::RetryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
    /// When the half-open trial call was let through
    trial_started: Option<Instant>,
}

/// Circuit breaker for AI scaling calls
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold exceeded, requests fail fast
/// - **Half-Open**: Reset timeout elapsed, a single trial request is let
///   through; its success closes the breaker, its failure re-opens it
///
/// A trial that never reports back (for example a cancelled call) stops
/// blocking once another reset timeout has passed.
///
/// # Configuration
///
/// Uses `RetryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingredient_scaler::circuit_breaker::CircuitBreaker;
    /// use ingredient_scaler::scaling_config::RetryConfig;
    ///
    /// let circuit_breaker = CircuitBreaker::new(&RetryConfig::default());
    /// assert!(!circuit_breaker.is_open());
    /// ```
    pub fn new(config: &RetryConfig) -> Self {
        Self::with_settings(
            config.circuit_breaker_threshold,
            Duration::from_secs(config.circuit_breaker_reset_secs),
        )
    }

    /// Create a breaker from a raw threshold and reset timeout
    pub fn with_settings(threshold: u32, reset_after: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold,
            reset_after,
        }
    }

    /// Check if the circuit breaker is open (blocking requests)
    ///
    /// A threshold of zero disables the breaker. After the reset timeout the
    /// first caller is admitted as the half-open trial and the breaker stays
    /// open for everyone else until that trial is recorded.
    pub fn is_open(&self) -> bool {
        if self.threshold == 0 {
            return false;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.failure_count < self.threshold {
            return false;
        }

        if state
            .last_failure
            .is_some_and(|last| last.elapsed() < self.reset_after)
        {
            return true;
        }

        if state
            .trial_started
            .is_some_and(|started| started.elapsed() < self.reset_after)
        {
            return true;
        }

        info!("AI circuit breaker half-open, letting a trial request through");
        state.trial_started = Some(Instant::now());
        false
    }

    /// Record a failed AI call
    ///
    /// A failure while half-open re-opens the breaker for another reset period.
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let was_trial = state.trial_started.take().is_some();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure = Some(Instant::now());

        if self.threshold > 0 && (was_trial || state.failure_count == self.threshold) {
            warn!(
                failures = state.failure_count,
                reset_secs = self.reset_after.as_secs(),
                "AI circuit breaker opened"
            );
        }
    }

    /// Record a successful AI call, closing the breaker
    pub fn record_success(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = BreakerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const RESET: Duration = Duration::from_millis(50);
    const PAST_RESET: Duration = Duration::from_millis(80);

    fn config(threshold: u32, reset_secs: u64) -> RetryConfig {
        RetryConfig {
            circuit_breaker_threshold: threshold,
            circuit_breaker_reset_secs: reset_secs,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(&config(2, 60));
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes_breaker() {
        let breaker = CircuitBreaker::new(&config(1, 60));
        breaker.record_failure();
        assert!(breaker.is_open());
        breaker.record_success();
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_half_open_admits_a_single_trial() {
        let breaker = CircuitBreaker::with_settings(2, RESET);
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.is_open());

        sleep(PAST_RESET);
        assert!(!breaker.is_open());
        // Trial in flight, everyone else still fails fast
        assert!(breaker.is_open());
    }

    #[test]
    fn test_failed_trial_reopens_after_one_failure() {
        let breaker = CircuitBreaker::with_settings(3, RESET);
        for _ in 0..3 {
            breaker.record_failure();
        }

        sleep(PAST_RESET);
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());

        sleep(PAST_RESET);
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_successful_trial_closes_breaker() {
        let breaker = CircuitBreaker::with_settings(1, RESET);
        breaker.record_failure();

        sleep(PAST_RESET);
        assert!(!breaker.is_open());
        breaker.record_success();
        assert!(!breaker.is_open());
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_abandoned_trial_expires() {
        let breaker = CircuitBreaker::with_settings(1, RESET);
        breaker.record_failure();

        sleep(PAST_RESET);
        assert!(!breaker.is_open());
        assert!(breaker.is_open());

        sleep(PAST_RESET);
        assert!(!breaker.is_open());
    }

    #[test]
    fn test_zero_threshold_disables_breaker() {
        let breaker = CircuitBreaker::new(&config(0, 60));
        for _ in 0..10 {
            breaker.record_failure();
        }
        assert!(!breaker.is_open());
    }
}
