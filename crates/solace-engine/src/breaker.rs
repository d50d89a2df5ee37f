//! Circuit breaker guarding the LLM provider.
//!
//! Classic three-state breaker. One breaker instance is shared per
//! provider; state transitions and counters are updated under a single
//! lock so concurrent failures cannot double-trip the breaker and
//! metrics stay exact under load.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures in closed state that open the circuit
    pub failure_threshold: u32,
    /// Consecutive successes in half-open state that close it again
    pub success_threshold: u32,
    /// Seconds to hold the circuit open before probing
    pub timeout_secs: u64,
    /// Size of the rolling outcome window behind `recent_failure_rate`
    pub window_size: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_secs: 30,
            window_size: 100,
        }
    }
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected without reaching the provider
    Open,
    /// Probing whether the provider recovered
    HalfOpen,
}

/// Cumulative call accounting. Accumulates across state transitions and
/// is cleared only by [`CircuitBreaker::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerMetrics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub last_failure_time: Option<DateTime<Utc>>,
}

impl BreakerMetrics {
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.failed_calls as f64 / self.total_calls as f64
        }
    }
}

/// Failure returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BreakerError<E> {
    /// Rejected without invoking the wrapped operation.
    #[error("circuit breaker is open, retry in {retry_after:?}")]
    Open { retry_after: Duration },

    /// The wrapped operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    next_attempt: Option<Instant>,
    recent: VecDeque<bool>,
    metrics: BreakerMetrics,
}

/// Wraps asynchronous operations against one external provider.
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                next_attempt: None,
                recent: VecDeque::new(),
                metrics: BreakerMetrics::default(),
            }),
        }
    }

    /// Execute one operation through the breaker.
    ///
    /// In the open state the operation is rejected immediately without
    /// being invoked. The first call at or after the probe deadline moves
    /// the breaker to half-open before executing. The operation's outcome
    /// is reported as exactly one breaker-tracked attempt; retrying is
    /// the caller's concern.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if let Some(retry_after) = self.admit() {
            return Err(BreakerError::Open { retry_after });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Admission check. Returns the remaining open time when rejecting;
    /// flips open → half-open when the probe deadline has passed.
    fn admit(&self) -> Option<Duration> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return None;
        }

        let now = Instant::now();
        match inner.next_attempt {
            Some(deadline) if now < deadline => {
                inner.metrics.rejected_calls += 1;
                Some(deadline - now)
            }
            _ => {
                info!("circuit breaker probing: open -> half-open");
                inner.state = CircuitState::HalfOpen;
                inner.consecutive_successes = 0;
                None
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.successful_calls += 1;
        Self::push_outcome(&mut inner, self.config.window_size, true);

        match inner.state {
            CircuitState::Closed => {
                // Only consecutive failures count toward tripping.
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    info!("circuit breaker recovered: half-open -> closed");
                    Self::close(&mut inner);
                }
            }
            CircuitState::Open => {
                // Unreachable through execute: open calls are rejected.
            }
        }
    }

    fn record_failure(&self, error: &dyn std::fmt::Display) {
        let mut inner = self.lock();
        inner.metrics.total_calls += 1;
        inner.metrics.failed_calls += 1;
        inner.metrics.last_failure_time = Some(Utc::now());
        Self::push_outcome(&mut inner, self.config.window_size, false);

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        failures = inner.consecutive_failures,
                        error = %error,
                        "circuit breaker tripped: closed -> open"
                    );
                    self.open_inner(&mut inner);
                }
            }
            CircuitState::HalfOpen => {
                // One failed probe reopens immediately.
                warn!(error = %error, "circuit breaker probe failed: half-open -> open");
                self.open_inner(&mut inner);
            }
            CircuitState::Open => {}
        }
    }

    /// Force the breaker open, as if it had just tripped.
    pub fn force_open(&self) {
        let mut inner = self.lock();
        self.open_inner(&mut inner);
    }

    /// Force the breaker closed, keeping accumulated metrics.
    pub fn force_closed(&self) {
        let mut inner = self.lock();
        Self::close(&mut inner);
    }

    /// Clear all counters and metrics and return to closed.
    pub fn reset(&self) {
        let mut inner = self.lock();
        Self::close(&mut inner);
        inner.recent.clear();
        inner.metrics = BreakerMetrics::default();
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn metrics(&self) -> BreakerMetrics {
        self.lock().metrics
    }

    /// Failure rate over the rolling outcome window.
    pub fn recent_failure_rate(&self) -> f64 {
        let inner = self.lock();
        if inner.recent.is_empty() {
            0.0
        } else {
            let failures = inner.recent.iter().filter(|ok| !**ok).count();
            failures as f64 / inner.recent.len() as f64
        }
    }

    fn open_inner(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.next_attempt =
            Some(Instant::now() + Duration::from_secs(self.config.timeout_secs));
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
    }

    fn close(inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.next_attempt = None;
    }

    fn push_outcome(inner: &mut BreakerInner, window: usize, ok: bool) {
        if window == 0 {
            return;
        }
        if inner.recent.len() == window {
            inner.recent.pop_front();
        }
        inner.recent.push_back(ok);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // Lock poisoning cannot leave partial state: every mutation
        // completes before the guard drops.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
