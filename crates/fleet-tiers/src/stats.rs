//! Per-tier request accounting.
//!
//! Cheap to clone; every clone shares the same counters, so a test can keep
//! a handle to a relay's stats after moving the relay into a task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use fleet_core::{Failure, Outcome, Slot};

#[derive(Clone, Default)]
pub struct TierStats {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    /// Requests answered with a value.
    served: AtomicU64,
    /// Requests answered with the failure sentinel.
    failed: AtomicU64,
    /// Connections closed without a reply (short or unreadable request).
    dropped: AtomicU64,
    /// Subset of `failed` rejected by validation.
    illegal: AtomicU64,
    /// downstream index -> times chosen
    selections: DashMap<u32, u64>,
}

impl TierStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Value(_) => {
                self.inner.served.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed(failure) => {
                self.inner.failed.fetch_add(1, Ordering::Relaxed);
                if *failure == Failure::IllegalRequest {
                    self.inner.illegal.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn record_dropped(&self) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a request was sent to downstream instance `index`.
    pub fn record_selection(&self, index: u32) {
        *self.inner.selections.entry(index).or_default() += 1;
    }

    pub fn served(&self) -> u64 {
        self.inner.served.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn illegal(&self) -> u64 {
        self.inner.illegal.load(Ordering::Relaxed)
    }

    /// Every request that reached the policy, whatever its outcome.
    pub fn handled(&self) -> u64 {
        self.served() + self.failed()
    }

    pub fn selections(&self, index: u32) -> u64 {
        self.inner
            .selections
            .get(&index)
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Log a one-line summary, typically on shutdown.
    pub fn log_summary(&self, slot: Slot) {
        let mut selections: Vec<(u32, u64)> = self
            .inner
            .selections
            .iter()
            .map(|e| (*e.key(), *e.value()))
            .collect();
        selections.sort_unstable();

        tracing::info!(
            %slot,
            served = self.served(),
            failed = self.failed(),
            illegal = self.illegal(),
            dropped = self.dropped(),
            selections = ?selections,
            "tier stats"
        );
    }
}
