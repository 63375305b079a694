use crate::backoff::BackoffPolicy;
use crate::error::{ReconnectError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Reconnection policy: grace delay, backoff curve, and retry budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Wait after a disconnect notification before inspecting state.
    /// The notification fires before the connection leaves the registry.
    pub grace_delay_ms: u64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub factor: f64,
    /// Retries for an address are abandoned once this window has elapsed
    pub max_window_ms: u64,
    pub max_iterations: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            grace_delay_ms: 5_000,
            min_interval_ms: 1_000,
            max_interval_ms: 30_000,
            factor: 2.0,
            max_window_ms: 300_000,
            max_iterations: 100,
        }
    }
}

impl ReconnectConfig {
    /// Read, parse, and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReconnectConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from {data_dir}/reconnect.json or return the default
    pub fn load_or_default(data_dir: &Path) -> Self {
        let path = data_dir.join("reconnect.json");

        if path.exists() {
            match Self::load(&path) {
                Ok(config) => {
                    tracing::info!(
                        "Loaded reconnect config: grace={}ms, interval={}..{}ms, window={}ms, max_iterations={}",
                        config.grace_delay_ms,
                        config.min_interval_ms,
                        config.max_interval_ms,
                        config.max_window_ms,
                        config.max_iterations
                    );
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to load reconnect.json: {}, using defaults", e);
                }
            }
        }

        Self::default()
    }

    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Optional: PEER_RECONNECT_GRACE_DELAY_MS, PEER_RECONNECT_MIN_INTERVAL_MS,
    /// PEER_RECONNECT_MAX_INTERVAL_MS, PEER_RECONNECT_FACTOR,
    /// PEER_RECONNECT_MAX_WINDOW_MS, PEER_RECONNECT_MAX_ITERATIONS
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            grace_delay_ms: env_or("PEER_RECONNECT_GRACE_DELAY_MS", defaults.grace_delay_ms)?,
            min_interval_ms: env_or("PEER_RECONNECT_MIN_INTERVAL_MS", defaults.min_interval_ms)?,
            max_interval_ms: env_or("PEER_RECONNECT_MAX_INTERVAL_MS", defaults.max_interval_ms)?,
            factor: env_or("PEER_RECONNECT_FACTOR", defaults.factor)?,
            max_window_ms: env_or("PEER_RECONNECT_MAX_WINDOW_MS", defaults.max_window_ms)?,
            max_iterations: env_or("PEER_RECONNECT_MAX_ITERATIONS", defaults.max_iterations)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ReconnectError::Config(format!(
                "factor must be a finite number >= 1.0, got {}",
                self.factor
            )));
        }
        if self.max_interval_ms == 0 {
            return Err(ReconnectError::Config(
                "max_interval_ms must be greater than zero".into(),
            ));
        }
        if self.min_interval_ms > self.max_interval_ms {
            return Err(ReconnectError::Config(format!(
                "min_interval_ms ({}) exceeds max_interval_ms ({})",
                self.min_interval_ms, self.max_interval_ms
            )));
        }
        if self.max_iterations == 0 {
            return Err(ReconnectError::Config(
                "max_iterations must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            min_interval: Duration::from_millis(self.min_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            factor: self.factor,
            max_window: Duration::from_millis(self.max_window_ms),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ReconnectError::Config(format!("Invalid {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
