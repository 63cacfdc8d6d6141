//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single session dispatcher
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Total units of work accepted into the mailbox
    scheduled_count: AtomicU64,
    /// Total units executed to completion (ok or err)
    executed_count: AtomicU64,
    /// Total units whose handler returned an error
    failed_count: AtomicU64,
    /// Total fire-and-forget failures routed to the fault channel
    faulted_count: AtomicU64,
    /// Total queued units cancelled at shutdown
    cancelled_count: AtomicU64,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled_count(&self) -> u64 {
        self.scheduled_count.load(Ordering::Relaxed)
    }

    pub fn inc_scheduled_count(&self) {
        self.scheduled_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn executed_count(&self) -> u64 {
        self.executed_count.load(Ordering::Relaxed)
    }

    pub fn inc_executed_count(&self) {
        self.executed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn inc_failed_count(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn faulted_count(&self) -> u64 {
        self.faulted_count.load(Ordering::Relaxed)
    }

    pub fn inc_faulted_count(&self) {
        self.faulted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled_count.load(Ordering::Relaxed)
    }

    pub fn inc_cancelled_count(&self) {
        self.cancelled_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scheduled_count: self.scheduled_count(),
            executed_count: self.executed_count(),
            failed_count: self.failed_count(),
            faulted_count: self.faulted_count(),
            cancelled_count: self.cancelled_count(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub scheduled_count: u64,
    pub executed_count: u64,
    pub failed_count: u64,
    pub faulted_count: u64,
    pub cancelled_count: u64,
}
