//! Delivery metric helpers
//!
//! Hot-path counters live next to the code that increments them (delivery,
//! session). Each metric name is owned by exactly one call site, so this
//! module covers only the host-level open event and the CLI's shutdown
//! summary.

use contracts::SessionId;
use metrics::{counter, gauge};

/// Record a session reaching Open.
pub fn record_session_opened(session_id: SessionId) {
    counter!("circuit_sessions_opened_total").increment(1);
    gauge!("circuit_last_session_id").set(session_id.value() as f64);
}

/// Running totals the demo host prints at shutdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeliveryStats {
    pub batches_produced: u64,
    pub batches_acked: u64,
    pub batches_resent: u64,
    pub disconnects: u64,
}

impl DeliveryStats {
    /// Batches produced but not yet acknowledged at the time of the snapshot.
    pub fn in_flight(&self) -> u64 {
        self.batches_produced.saturating_sub(self.batches_acked)
    }
}
