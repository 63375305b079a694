//! Per-address backoff schedule: capped exponential delays and a retry window.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// Shape of the delay curve and the overall retry window
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Growth per iteration; values below 1.0 are treated as 1.0
    pub factor: f64,
    pub max_window: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        crate::config::ReconnectConfig::default().policy()
    }
}

impl BackoffPolicy {
    /// Delay for a given iteration (0-indexed): `min(min_interval * factor^i, max_interval)`
    pub fn delay_for(&self, iteration: u32) -> Duration {
        let factor = if self.factor.is_finite() {
            self.factor.max(1.0)
        } else {
            1.0
        };
        let exp = i32::try_from(iteration).unwrap_or(i32::MAX);
        let secs = self.min_interval.as_secs_f64() * factor.powi(exp);
        let cap = self.max_interval.as_secs_f64();

        // NaN (0 * inf) and inf both land on the cap
        if secs.is_finite() && secs < cap {
            Duration::from_secs_f64(secs)
        } else {
            self.max_interval
        }
    }
}

/// Retry state for one peer address.
///
/// Owned by exactly one retry task at a time, so there is no internal locking.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    started_at: Instant,
    created_at: DateTime<Utc>,
    iteration: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            started_at: Instant::now(),
            created_at: Utc::now(),
            iteration: 0,
        }
    }

    /// Delay to wait before the next attempt. Advances the iteration counter.
    pub fn next_duration(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.iteration);
        self.iteration = self.iteration.saturating_add(1);
        delay
    }

    /// True once more than `max_window` has elapsed since creation
    pub fn timeout_exceeded(&self) -> bool {
        self.elapsed() > self.policy.max_window
    }

    /// Number of delays issued so far
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}
