//! Acknowledgement processor.
//!
//! Translates client-reported batch completions into queue state changes.
//! The network may lose acks, duplicate them, or deliver them out of their
//! original send order; cumulative semantics make all of those safe. Must be
//! called only from the owning session's dispatcher.

use contracts::CircuitError;
use tracing::{debug, warn};

use crate::queue::{AckOutcome, PendingBatchQueue};

/// What the session should do after processing one acknowledgement.
#[derive(Debug)]
pub enum AckDisposition {
    /// Duplicate or empty-advance; nothing changed, nothing to do
    Ignored,
    /// Queue advanced and freed capacity; deferred production may resume
    Advanced { removed: usize },
    /// Protocol violation; the session must surface this and close
    Fatal(CircuitError),
}

/// Apply one client acknowledgement `(sequence, error-or-none)` to the queue.
///
/// On `Advanced`, the batch matching the acked sequence exactly has its
/// completion resolved with the client-reported error (if any); every other
/// removed batch resolves success. An error nobody awaits is logged so it
/// never vanishes silently.
pub fn process_ack(
    queue: &mut PendingBatchQueue,
    sequence: u64,
    error: Option<String>,
) -> AckDisposition {
    match queue.try_acknowledge_up_to(sequence) {
        AckOutcome::Duplicate => {
            // Acking a backpressure event that already resolved; benign
            debug!(sequence, "duplicate acknowledgement ignored");
            AckDisposition::Ignored
        }
        AckOutcome::Advanced { removed } => {
            let count = removed.len();
            let mut error_delivered = false;
            for entry in removed {
                let exact = entry.batch.sequence == sequence;
                if let Some(done_tx) = entry.completion {
                    let result = match &error {
                        Some(message) if exact => {
                            error_delivered = true;
                            Err(CircuitError::Other(message.clone()))
                        }
                        _ => Ok(()),
                    };
                    let _ = done_tx.send(result);
                }
            }
            if let Some(message) = &error {
                if !error_delivered {
                    warn!(sequence, message = %message, "client reported batch error");
                    metrics::counter!("circuit_client_reported_errors_total").increment(1);
                }
            }
            if count == 0 {
                debug!(sequence, "acknowledgement over already-acked ground");
                AckDisposition::Ignored
            } else {
                metrics::counter!("circuit_batches_acked_total").increment(count as u64);
                AckDisposition::Advanced { removed: count }
            }
        }
        AckOutcome::OutOfRange { highest } => AckDisposition::Fatal(
            CircuitError::OutOfRangeAcknowledgement {
                acked: sequence,
                highest,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn queue_with(n: usize) -> PendingBatchQueue {
        let mut queue = PendingBatchQueue::new(16);
        for _ in 0..n {
            queue.enqueue(b"payload").unwrap();
        }
        queue
    }

    #[test]
    fn test_advanced_reports_removed_count() {
        let mut queue = queue_with(4);
        match process_ack(&mut queue, 3, None) {
            AckDisposition::Advanced { removed } => assert_eq!(removed, 3),
            other => panic!("expected Advanced, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_is_ignored() {
        let mut queue = queue_with(4);
        process_ack(&mut queue, 2, None);
        assert!(matches!(
            process_ack(&mut queue, 1, None),
            AckDisposition::Ignored
        ));
    }

    #[test]
    fn test_out_of_range_is_fatal() {
        let mut queue = queue_with(2);
        match process_ack(&mut queue, 7, None) {
            AckDisposition::Fatal(CircuitError::OutOfRangeAcknowledgement { acked, highest }) => {
                assert_eq!(acked, 7);
                assert_eq!(highest, 2);
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
        // No queue mutation on violation
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_error_delivered_to_exact_sequence_only() {
        let mut queue = PendingBatchQueue::new(16);
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (done_tx, done_rx) = oneshot::channel();
            queue.enqueue_with_completion(b"x", Some(done_tx)).unwrap();
            receivers.push(done_rx);
        }

        process_ack(&mut queue, 3, Some("render failed".into()));

        let mut results = Vec::new();
        for mut rx in receivers {
            results.push(rx.try_recv().unwrap());
        }
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(&results[2], Err(CircuitError::Other(m)) if m == "render failed"));
    }

    #[test]
    fn test_error_without_completion_still_advances() {
        let mut queue = queue_with(2);
        // No completions were attached; the error is reported, not dropped
        // together with the whole disposition.
        match process_ack(&mut queue, 2, Some("client choked".into())) {
            AckDisposition::Advanced { removed } => assert_eq!(removed, 2),
            other => panic!("expected Advanced, got {other:?}"),
        }
        assert!(queue.is_empty());
    }
}
