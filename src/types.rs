use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Address of a remote peer, e.g. "10.0.0.1:9000". Sole key for backoff state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddr(String);

impl PeerAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        PeerAddr(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddr {
    fn from(s: &str) -> Self {
        PeerAddr(s.to_string())
    }
}

impl From<String> for PeerAddr {
    fn from(s: String) -> Self {
        PeerAddr(s)
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        PeerAddr(addr.to_string())
    }
}

impl AsRef<str> for PeerAddr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a retry task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectOutcome {
    /// Dial succeeded and the connection manager reports the peer connected
    Reconnected { iterations: u32 },
    /// Someone else (e.g. an inbound connection) restored the peer first
    AlreadyConnected { iterations: u32 },
    /// The retry window elapsed
    TimedOut { iterations: u32 },
    /// Iteration cap reached without success
    Exhausted { iterations: u32 },
    /// The registry entry was removed while the loop was running
    Cancelled { iterations: u32 },
    /// Another task was already backing off this address
    Skipped,
}

impl ReconnectOutcome {
    /// Number of backoff iterations the task executed
    pub fn iterations(&self) -> u32 {
        match *self {
            ReconnectOutcome::Reconnected { iterations }
            | ReconnectOutcome::AlreadyConnected { iterations }
            | ReconnectOutcome::TimedOut { iterations }
            | ReconnectOutcome::Exhausted { iterations }
            | ReconnectOutcome::Cancelled { iterations } => iterations,
            ReconnectOutcome::Skipped => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReconnectOutcome::Reconnected { .. })
    }
}

/// One address currently being retried
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveBackoff {
    pub addr: PeerAddr,
    pub iteration: u32,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Cumulative counters since the controller was created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectStats {
    pub spawned: u64,
    pub skipped: u64,
    pub dial_attempts: u64,
    pub dial_failures: u64,
    pub reconnected: u64,
    pub already_connected: u64,
    pub timed_out: u64,
    pub exhausted: u64,
    pub cancelled: u64,
}

/// Reconnection status for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectStatus {
    pub active: Vec<ActiveBackoff>,
    pub stats: ReconnectStats,
}
