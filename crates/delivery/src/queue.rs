//! Pending batch queue with bounded-capacity backpressure.
//!
//! A plain `VecDeque`: batches enter at the tail with the next sequence
//! number and only ever leave from the head, as a consequence of a
//! cumulative acknowledgement or session close. Payloads are snapshotted on
//! enqueue, so the producer's working buffer may be reused immediately.

use std::collections::VecDeque;

use bytes::Bytes;
use contracts::{Batch, CircuitError};
use tokio::sync::oneshot;

/// One produced-but-unacknowledged batch, with an optional completion
/// signal resolved when the client acknowledges it (or the session closes).
#[derive(Debug)]
pub struct PendingBatch {
    pub batch: Batch,
    pub completion: Option<oneshot::Sender<Result<(), CircuitError>>>,
}

/// Outcome of a cumulative acknowledgement attempt.
#[derive(Debug)]
pub enum AckOutcome {
    /// Acked below the lowest pending sequence; contents untouched. Benign.
    Duplicate,
    /// Removed every pending batch with sequence <= the acked value.
    /// May be empty when the acked ground was already fully acknowledged.
    Advanced { removed: Vec<PendingBatch> },
    /// Acked a sequence never produced. Protocol violation, fatal.
    OutOfRange { highest: u64 },
}

/// Ordered, bounded buffer of produced-but-unacknowledged batches.
///
/// Invariants: member sequence numbers are strictly increasing, the queue
/// never reorders, and removal happens only from the head.
#[derive(Debug)]
pub struct PendingBatchQueue {
    pending: VecDeque<PendingBatch>,
    /// Highest sequence number ever produced (0 before the first enqueue)
    highest_produced: u64,
    max_pending: usize,
}

impl PendingBatchQueue {
    /// Create a queue admitting at most `max_pending` unacknowledged batches.
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending),
            highest_produced: 0,
            max_pending,
        }
    }

    /// Number of pending batches.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Backpressure signal: the producer must defer while this is true.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.max_pending
    }

    /// Highest sequence number ever assigned (0 if none).
    #[inline]
    pub fn highest_produced(&self) -> u64 {
        self.highest_produced
    }

    /// Sequence number of the oldest pending batch.
    #[inline]
    pub fn lowest_pending(&self) -> Option<u64> {
        self.pending.front().map(|p| p.batch.sequence)
    }

    /// The most recently enqueued batch, if any is still pending.
    #[inline]
    pub fn back(&self) -> Option<&Batch> {
        self.pending.back().map(|p| &p.batch)
    }

    /// Snapshot the payload, assign the next sequence number, append.
    ///
    /// # Errors
    /// `QueueFull` when the producer failed to consult [`Self::is_full`];
    /// production must defer instead of enqueueing past the bound.
    pub fn enqueue(&mut self, payload: &[u8]) -> Result<u64, CircuitError> {
        self.enqueue_with_completion(payload, None)
    }

    /// As [`Self::enqueue`], registering a completion resolved on ack.
    pub fn enqueue_with_completion(
        &mut self,
        payload: &[u8],
        completion: Option<oneshot::Sender<Result<(), CircuitError>>>,
    ) -> Result<u64, CircuitError> {
        if self.is_full() {
            return Err(CircuitError::QueueFull {
                pending: self.pending.len(),
                max: self.max_pending,
            });
        }
        let sequence = self.highest_produced + 1;
        self.highest_produced = sequence;
        self.pending.push_back(PendingBatch {
            batch: Batch::new(sequence, Bytes::copy_from_slice(payload)),
            completion,
        });
        Ok(sequence)
    }

    /// Cumulative acknowledgement: remove every pending batch with sequence
    /// <= `sequence`, oldest first.
    ///
    /// An ack over already-acknowledged ground with nothing pending is
    /// `Advanced` with zero removals, which is observably equivalent to a
    /// duplicate and simpler to reason about.
    pub fn try_acknowledge_up_to(&mut self, sequence: u64) -> AckOutcome {
        if sequence > self.highest_produced {
            return AckOutcome::OutOfRange {
                highest: self.highest_produced,
            };
        }
        if let Some(lowest) = self.lowest_pending() {
            if sequence < lowest {
                return AckOutcome::Duplicate;
            }
        }

        let mut removed = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|front| front.batch.sequence <= sequence)
        {
            if let Some(entry) = self.pending.pop_front() {
                removed.push(entry);
            }
        }
        AckOutcome::Advanced { removed }
    }

    /// All pending batches, oldest first, for retransmission after a
    /// (re)connect. Never mutates the queue; `Bytes` clones share storage.
    pub fn snapshot_for_resend(&self) -> Vec<Batch> {
        self.pending.iter().map(|p| p.batch.clone()).collect()
    }

    /// Drop everything pending, failing registered completions with the
    /// given error. Used on session close.
    pub fn clear(&mut self, error: impl Fn() -> CircuitError) {
        for entry in self.pending.drain(..) {
            if let Some(done_tx) = entry.completion {
                let _ = done_tx.send(Err(error()));
            }
        }
    }
}
