//! Bounded retry policy for provider attempts.
//!
//! The orchestrator drives the loop itself so that every attempt is
//! reported to the circuit breaker individually; this module only
//! answers "may I retry, and after how long".

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

pub struct RetryPolicy {
    config: RetryConfig,
    current_attempt: usize,
    current_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            current_delay_ms: config.initial_delay_ms,
            current_attempt: 0,
            config,
        }
    }

    /// Delay before the next retry, or `None` when the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.config.max_retries {
            return None;
        }

        let delay = Duration::from_millis(self.current_delay_ms);
        self.current_attempt += 1;

        self.current_delay_ms = ((self.current_delay_ms as f64) * self.config.multiplier)
            .min(self.config.max_delay_ms as f64) as u64;

        Some(delay)
    }

    pub fn attempt(&self) -> usize {
        self.current_attempt
    }
}
