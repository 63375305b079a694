use async_trait::async_trait;
use peer_reconnect::{ConnectionManager, PeerAddr, ReconnectConfig, ReconnectError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Scripted connection manager: each dial pops the next scripted result
pub struct MockConnection {
    script: Mutex<VecDeque<bool>>,
    /// Result once the script runs out
    fallback: bool,
    /// Whether a successful dial makes `is_connected` report true
    registers_on_success: bool,
    connected: AtomicBool,
    dials: Mutex<Vec<Instant>>,
    connectivity_checks: AtomicUsize,
}

#[allow(dead_code)]
impl MockConnection {
    fn build(script: Vec<bool>, fallback: bool) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            registers_on_success: true,
            connected: AtomicBool::new(false),
            dials: Mutex::new(Vec::new()),
            connectivity_checks: AtomicUsize::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self::build(vec![], false)
    }

    pub fn always_succeeding() -> Self {
        Self::build(vec![], true)
    }

    pub fn failing_then_succeeding(failures: usize) -> Self {
        Self::build(vec![false; failures], true)
    }

    /// Peer is already connected before the first iteration
    pub fn already_connected() -> Self {
        let conn = Self::always_failing();
        conn.connected.store(true, Ordering::SeqCst);
        conn
    }

    /// Dial reports success but the connection never shows up
    pub fn unregistered_success() -> Self {
        let mut conn = Self::always_succeeding();
        conn.registers_on_success = false;
        conn
    }

    pub fn dial_count(&self) -> usize {
        self.dials.lock().unwrap().len()
    }

    pub fn dial_times(&self) -> Vec<Instant> {
        self.dials.lock().unwrap().clone()
    }

    /// Gaps between consecutive dials, rounded to whole seconds
    pub fn dial_gaps_secs(&self) -> Vec<u64> {
        self.dial_times()
            .windows(2)
            .map(|w| round_secs(w[1] - w[0]))
            .collect()
    }

    pub fn connectivity_checks(&self) -> usize {
        self.connectivity_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionManager for MockConnection {
    async fn dial(&self, addr: &PeerAddr) -> peer_reconnect::Result<()> {
        self.dials.lock().unwrap().push(Instant::now());
        let ok = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        if !ok {
            return Err(ReconnectError::dial(addr, "connection refused"));
        }
        if self.registers_on_success {
            self.connected.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_connected(&self, _addr: &PeerAddr) -> bool {
        self.connectivity_checks.fetch_add(1, Ordering::SeqCst);
        self.connected.load(Ordering::SeqCst)
    }
}

#[allow(dead_code)]
pub fn round_secs(d: Duration) -> u64 {
    ((d.as_millis() + 500) / 1000) as u64
}

/// Defaults with a window long enough that only the iteration cap applies
#[allow(dead_code)]
pub fn config_with_iterations(max_iterations: u32) -> ReconnectConfig {
    ReconnectConfig {
        max_iterations,
        max_window_ms: 24 * 60 * 60 * 1000,
        ..Default::default()
    }
}
