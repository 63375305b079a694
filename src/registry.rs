use crate::backoff::Backoff;
use crate::types::{ActiveBackoff, PeerAddr};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Concurrency-safe map of peer address -> active backoff schedule.
///
/// An address is present iff a retry task is currently backing off that
/// address. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct BackoffRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    entries: DashMap<PeerAddr, ActiveEntry>,
    next_epoch: AtomicU64,
}

struct ActiveEntry {
    /// Distinguishes this insertion from any later one for the same address
    epoch: u64,
    backoff: Backoff,
}

/// What the retry loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Entry removed or replaced by someone else
    Missing,
    TimedOut { elapsed: Duration },
    /// Sleep `delay`, then attempt reconnection. `iteration` is 1-based.
    Wait { delay: Duration, iteration: u32 },
}

impl BackoffRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically insert `backoff` for `addr` unless an entry already exists.
    ///
    /// Returns a guard that owns the entry; dropping it removes the entry.
    pub fn try_begin(&self, addr: &PeerAddr, backoff: Backoff) -> Option<BackoffGuard> {
        match self.inner.entries.entry(addr.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
                slot.insert(ActiveEntry { epoch, backoff });
                Some(BackoffGuard {
                    registry: self.clone(),
                    addr: addr.clone(),
                    epoch,
                })
            }
        }
    }

    pub fn contains(&self, addr: &PeerAddr) -> bool {
        self.inner.entries.contains_key(addr)
    }

    /// Remove the entry for `addr`. The owning task stops at its next iteration.
    pub fn remove(&self, addr: &PeerAddr) -> bool {
        self.inner.entries.remove(addr).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Point-in-time view of every active backoff, sorted by address
    pub fn snapshot(&self) -> Vec<ActiveBackoff> {
        let mut active: Vec<ActiveBackoff> = self
            .inner
            .entries
            .iter()
            .map(|entry| ActiveBackoff {
                addr: entry.key().clone(),
                iteration: entry.backoff.iteration(),
                elapsed_ms: entry.backoff.elapsed().as_millis() as u64,
                created_at: entry.backoff.created_at(),
            })
            .collect();
        active.sort_by(|a, b| a.addr.cmp(&b.addr));
        active
    }
}

/// Exclusive handle on one registry entry, held by the retry task driving it
pub struct BackoffGuard {
    registry: BackoffRegistry,
    addr: PeerAddr,
    epoch: u64,
}

impl BackoffGuard {
    pub fn addr(&self) -> &PeerAddr {
        &self.addr
    }

    /// Re-read the schedule and advance it if retries should continue
    pub fn next_step(&self) -> Step {
        let Some(mut entry) = self.registry.inner.entries.get_mut(&self.addr) else {
            return Step::Missing;
        };
        if entry.epoch != self.epoch {
            return Step::Missing;
        }
        if entry.backoff.timeout_exceeded() {
            return Step::TimedOut {
                elapsed: entry.backoff.elapsed(),
            };
        }
        let delay = entry.backoff.next_duration();
        Step::Wait {
            delay,
            iteration: entry.backoff.iteration(),
        }
    }
}

impl Drop for BackoffGuard {
    fn drop(&mut self) {
        let epoch = self.epoch;
        self.registry
            .inner
            .entries
            .remove_if(&self.addr, |_, entry| entry.epoch == epoch);
    }
}
