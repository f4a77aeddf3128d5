//! Retry policy and circuit breaker for remote calls
//!
//! The policy only computes delays; callers drive their own (async) loop.
//! The breaker shares the cache's [`Clock`] so its reset window can be
//! tested without sleeping.

use crate::cache::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff schedule for a remote call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Short waits, for interactive lookups
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Long waits, for Overpass which rate limits aggressively
    pub fn patient() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Wait before `attempt`; attempt 0 goes out immediately.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let capped = (self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());

        // Up to 25% extra
        let factor = if self.jitter { 1.0 + jitter_fraction() * 0.25 } else { 1.0 };
        Duration::from_secs_f64(capped * factor)
    }
}

/// Pseudo-random number in [0.0, 1.0)
fn jitter_fraction() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(SystemClock.now_millis());
    (hasher.finish() % 1000) as f64 / 1000.0
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening circuit
    pub failure_threshold: u32,
    /// Number of successes in half-open to close circuit
    pub success_threshold: u32,
    /// Time to wait before trying half-open
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Breaker counters, updated under one lock
#[derive(Debug, Clone, Copy)]
struct Breaker {
    state: CircuitState,
    failures: u32,
    half_open_successes: u32,
    opened_at_ms: u64,
}

/// Stops calling an origin that keeps failing, probing again after
/// `reset_timeout`.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Breaker>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("breaker", &*self.lock())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            inner: Mutex::new(Breaker {
                state: CircuitState::Closed,
                failures: 0,
                half_open_successes: 0,
                opened_at_ms: 0,
            }),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // A poisoned lock still holds consistent counters
    fn lock(&self) -> MutexGuard<'_, Breaker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Whether a call may go out now; an open circuit turns half-open once
    /// the reset window has passed.
    pub fn can_execute(&self) -> bool {
        let mut breaker = self.lock();
        match breaker.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let reset_ms = self.config.reset_timeout.as_millis() as u64;
                if self.clock.now_millis().saturating_sub(breaker.opened_at_ms) < reset_ms {
                    return false;
                }
                debug!("circuit half-open, probing origin");
                breaker.state = CircuitState::HalfOpen;
                breaker.half_open_successes = 0;
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut breaker = self.lock();
        breaker.failures = 0;

        if breaker.state == CircuitState::HalfOpen {
            breaker.half_open_successes += 1;
            if breaker.half_open_successes >= self.config.success_threshold {
                debug!("circuit closed");
                breaker.state = CircuitState::Closed;
            }
        }
    }

    pub fn record_failure(&self) {
        let mut breaker = self.lock();
        breaker.failures += 1;

        let trip = match breaker.state {
            CircuitState::Closed => breaker.failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            warn!(failures = breaker.failures, "circuit opened");
            breaker.state = CircuitState::Open;
            breaker.opened_at_ms = self.clock.now_millis();
        }
    }

    pub fn reset(&self) {
        let mut breaker = self.lock();
        breaker.state = CircuitState::Closed;
        breaker.failures = 0;
        breaker.half_open_successes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            jitter: false,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(100),
            jitter: true,
            ..Default::default()
        };
        let delay = config.delay_for_attempt(1);
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(125));
    }

    #[test]
    fn test_circuit_breaker_opens_on_failures() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        });

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());
    }

    #[test]
    fn test_circuit_breaker_half_open_after_timeout() {
        let clock = Arc::new(ManualClock::new(10_000));
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            reset_timeout: Duration::from_secs(30),
        })
        .with_clock(clock.clone());

        cb.record_failure();
        assert!(!cb.can_execute());

        clock.advance(Duration::from_secs(30));
        assert!(cb.can_execute());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let clock = Arc::new(ManualClock::new(0));
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(1),
        })
        .with_clock(clock.clone());

        cb.record_failure();
        clock.advance(Duration::from_secs(2));
        assert!(cb.can_execute());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_circuit_breaker_reset() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
