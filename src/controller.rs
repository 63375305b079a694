use crate::backoff::Backoff;
use crate::config::ReconnectConfig;
use crate::connection::{ConnectionManager, PeerDisconnectHandler};
use crate::registry::{BackoffGuard, BackoffRegistry, Step};
use crate::task::RetryTasks;
use crate::types::{PeerAddr, ReconnectOutcome, ReconnectStats, ReconnectStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Reacts to peer disconnects by re-dialing with backoff, at most one loop per address
pub struct ReconnectController {
    config: ReconnectConfig,
    registry: BackoffRegistry,
    tasks: RetryTasks,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    spawned: AtomicU64,
    skipped: AtomicU64,
    dial_attempts: AtomicU64,
    dial_failures: AtomicU64,
    reconnected: AtomicU64,
    already_connected: AtomicU64,
    timed_out: AtomicU64,
    exhausted: AtomicU64,
    cancelled: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, outcome: &ReconnectOutcome) {
        let counter = match outcome {
            ReconnectOutcome::Reconnected { .. } => &self.reconnected,
            ReconnectOutcome::AlreadyConnected { .. } => &self.already_connected,
            ReconnectOutcome::TimedOut { .. } => &self.timed_out,
            ReconnectOutcome::Exhausted { .. } => &self.exhausted,
            ReconnectOutcome::Cancelled { .. } => &self.cancelled,
            ReconnectOutcome::Skipped => &self.skipped,
        };
        Self::bump(counter);
    }

    fn snapshot(&self) -> ReconnectStats {
        ReconnectStats {
            spawned: self.spawned.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dial_attempts: self.dial_attempts.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            reconnected: self.reconnected.load(Ordering::Relaxed),
            already_connected: self.already_connected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl ReconnectController {
    /// Retry tasks run on the current Tokio runtime. Panics outside one.
    pub fn new(config: ReconnectConfig) -> Arc<Self> {
        Self::with_registry(config, BackoffRegistry::new())
    }

    /// Build a controller around an existing registry, bound to the current runtime
    pub fn with_registry(config: ReconnectConfig, registry: BackoffRegistry) -> Arc<Self> {
        Self::with_runtime(config, registry, Handle::current())
    }

    /// Build a controller whose retry tasks run on `runtime`.
    ///
    /// Usable from threads that are not part of any Tokio runtime.
    pub fn with_runtime(
        config: ReconnectConfig,
        registry: BackoffRegistry,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            tasks: RetryTasks::with_runtime(runtime),
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackoffRegistry {
        &self.registry
    }

    /// Start a retry sequence for `addr` in the background.
    ///
    /// Returns immediately and may be called from any thread. The handle may
    /// be dropped; the task keeps running.
    pub fn on_disconnect(
        &self,
        addr: impl Into<PeerAddr>,
        conn: Arc<dyn ConnectionManager>,
    ) -> JoinHandle<ReconnectOutcome> {
        let addr = addr.into();
        Counters::bump(&self.counters.spawned);
        tracing::debug!(
            "[RECONNECT {}] disconnect received, checking again in {}ms",
            addr,
            self.config.grace_delay_ms
        );

        self.tasks.spawn(run_backoff(
            addr,
            conn,
            self.config.clone(),
            self.registry.clone(),
            Arc::clone(&self.counters),
        ))
    }

    pub fn is_backing_off(&self, addr: &PeerAddr) -> bool {
        self.registry.contains(addr)
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop retrying `addr`. The task notices at its next iteration.
    pub fn cancel(&self, addr: &PeerAddr) -> bool {
        let removed = self.registry.remove(addr);
        if removed {
            tracing::info!("[RECONNECT {}] backoff cancelled", addr);
        }
        removed
    }

    /// Wait for every retry task spawned so far to finish
    pub async fn wait_idle(&self) {
        self.tasks.wait_idle().await;
    }

    pub fn stats(&self) -> ReconnectStats {
        self.counters.snapshot()
    }

    pub fn status(&self) -> ReconnectStatus {
        ReconnectStatus {
            active: self.registry.snapshot(),
            stats: self.stats(),
        }
    }
}

impl PeerDisconnectHandler for ReconnectController {
    fn peer_disconnected(&self, addr: PeerAddr, conn: Arc<dyn ConnectionManager>) {
        // Fire-and-forget: the task is tracked by the controller
        let _ = self.on_disconnect(addr, conn);
    }
}

async fn run_backoff(
    addr: PeerAddr,
    conn: Arc<dyn ConnectionManager>,
    config: ReconnectConfig,
    registry: BackoffRegistry,
    counters: Arc<Counters>,
) -> ReconnectOutcome {
    // The disconnect callback fires before the connection is torn down
    tokio::time::sleep(config.grace_delay()).await;

    let Some(guard) = registry.try_begin(&addr, Backoff::new(config.policy())) else {
        tracing::info!("[RECONNECT {}] backoff skipped, already active", addr);
        let outcome = ReconnectOutcome::Skipped;
        counters.record(&outcome);
        return outcome;
    };

    tracing::info!(
        "[RECONNECT {}] backoff started (max_iterations={}, window={}ms)",
        addr,
        config.max_iterations,
        config.max_window_ms
    );

    let outcome = drive(&guard, conn.as_ref(), config.max_iterations, &counters).await;
    drop(guard);

    counters.record(&outcome);
    match outcome {
        ReconnectOutcome::Reconnected { iterations } => {
            tracing::info!(
                "[RECONNECT {}] reconnected after {} iteration(s)",
                addr,
                iterations
            );
        }
        ReconnectOutcome::AlreadyConnected { iterations } => {
            tracing::info!(
                "[RECONNECT {}] peer already connected, stopping after {} iteration(s)",
                addr,
                iterations
            );
        }
        ReconnectOutcome::Exhausted { iterations } => {
            tracing::info!(
                "[RECONNECT {}] backoff abandoned after {} iteration(s)",
                addr,
                iterations
            );
        }
        ReconnectOutcome::Cancelled { iterations } => {
            tracing::info!(
                "[RECONNECT {}] backoff cleared externally after {} iteration(s)",
                addr,
                iterations
            );
        }
        // Logged inside the loop with the elapsed time
        ReconnectOutcome::TimedOut { .. } | ReconnectOutcome::Skipped => {}
    }

    outcome
}

async fn drive(
    guard: &BackoffGuard,
    conn: &dyn ConnectionManager,
    max_iterations: u32,
    counters: &Counters,
) -> ReconnectOutcome {
    let addr = guard.addr();
    let mut iterations = 0;

    while iterations < max_iterations {
        let delay = match guard.next_step() {
            Step::Missing => return ReconnectOutcome::Cancelled { iterations },
            Step::TimedOut { elapsed } => {
                tracing::info!(
                    "[RECONNECT {}] backoff ended, timed out after {:?}",
                    addr,
                    elapsed
                );
                return ReconnectOutcome::TimedOut { iterations };
            }
            Step::Wait { delay, iteration } => {
                tracing::info!(
                    "[RECONNECT {}] reconnecting in {:?}, iteration {}",
                    addr,
                    delay,
                    iteration
                );
                delay
            }
        };

        tokio::time::sleep(delay).await;
        iterations += 1;

        // Skip the dial if something else already restored the connection
        if conn.is_connected(addr) {
            return ReconnectOutcome::AlreadyConnected { iterations };
        }

        Counters::bump(&counters.dial_attempts);
        if let Err(e) = conn.dial(addr).await {
            Counters::bump(&counters.dial_failures);
            tracing::warn!("[RECONNECT {}] dial failed: {}", addr, e);
            continue;
        }

        if conn.is_connected(addr) {
            return ReconnectOutcome::Reconnected { iterations };
        }
        tracing::debug!(
            "[RECONNECT {}] dial returned but connection not registered yet",
            addr
        );
    }

    ReconnectOutcome::Exhausted { iterations }
}
