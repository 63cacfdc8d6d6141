//! Batch - one sequence-numbered unit of diff output

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One immutable unit of diff output sent to the client.
///
/// Sequence numbers are assigned by the owning circuit's pending queue,
/// start at 1, increase by exactly 1, and are never reused. The payload is a
/// snapshot: the producer's working buffer may be reused immediately after
/// enqueue.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Gapless, monotonically increasing sequence number (starts at 1)
    pub sequence: u64,

    /// Opaque diff payload snapshot
    pub payload: Bytes,

    /// Production timestamp (diagnostics only, not part of the protocol)
    pub produced_at: DateTime<Utc>,
}

impl Batch {
    /// Build a batch from a payload snapshot, stamped now.
    pub fn new(sequence: u64, payload: Bytes) -> Self {
        Self {
            sequence,
            payload,
            produced_at: Utc::now(),
        }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
