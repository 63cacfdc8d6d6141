//! OutboundHandle - per-connection sender with isolated queue and worker task
//!
//! One worker per attached transport drains an ordered frame queue, so the
//! session's logical thread never waits on network I/O while batch order is
//! still preserved. A send failure is logged and the batch stays pending in
//! the session's queue for resend on the next connect.

use std::sync::Arc;

use bytes::Bytes;
use contracts::{ConnectionId, SessionId, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

/// One frame queued for transmission, in sequence order.
#[derive(Debug)]
pub(crate) enum OutboundFrame {
    /// A produced or resent batch
    Batch { sequence: u64, payload: Bytes },
    /// Terminal error notification, sent once before forced close
    Error { message: String },
}

/// Handle to a running per-connection sender worker.
pub(crate) struct OutboundHandle {
    connection_id: ConnectionId,
    tx: mpsc::Sender<OutboundFrame>,
    worker: JoinHandle<()>,
}

impl OutboundHandle {
    /// Spawn the sender worker for a freshly attached transport.
    pub(crate) fn spawn(
        session_id: SessionId,
        transport: Arc<dyn Transport>,
        queue_capacity: usize,
    ) -> Self {
        let connection_id = transport.connection_id();
        let (tx, rx) = mpsc::channel(queue_capacity);

        let worker = tokio::spawn(async move {
            outbound_worker(session_id, transport, rx).await;
        });

        Self {
            connection_id,
            tx,
            worker,
        }
    }

    pub(crate) fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Queue a frame without blocking the logical thread.
    ///
    /// Returns false when the queue is full; capacity is sized above the
    /// pending-batch bound, so a full queue means the worker is wedged and
    /// the session should treat the connection as lost.
    pub(crate) fn try_send(&self, frame: OutboundFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    connection_id = %self.connection_id,
                    "outbound queue full, connection considered wedged"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(
                    connection_id = %self.connection_id,
                    "outbound worker stopped unexpectedly"
                );
                false
            }
        }
    }

    /// Drop the connection immediately. Queued frames are lost; the batches
    /// they carried remain pending in the session queue.
    pub(crate) fn abort(self) {
        self.worker.abort();
    }

    /// Stop accepting frames and let the worker drain what is queued,
    /// without stalling the caller.
    pub(crate) fn release(self) {
        let Self {
            connection_id,
            tx,
            worker,
        } = self;
        drop(tx);
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    error!(connection_id = %connection_id, error = ?e, "outbound worker panicked");
                }
            }
        });
    }
}

/// Worker task that delivers frames through the transport, in queue order.
#[instrument(name = "outbound_worker", skip(transport, rx), fields(session_id = %session_id))]
async fn outbound_worker(
    session_id: SessionId,
    transport: Arc<dyn Transport>,
    mut rx: mpsc::Receiver<OutboundFrame>,
) {
    let connection_id = transport.connection_id();
    debug!(connection_id = %connection_id, "outbound worker started");

    while let Some(frame) = rx.recv().await {
        match frame {
            OutboundFrame::Batch { sequence, payload } => {
                if let Err(e) = transport.send_batch(session_id, sequence, payload).await {
                    // Not fatal: the batch stays pending for resend
                    warn!(
                        connection_id = %connection_id,
                        sequence,
                        error = %e,
                        "transport send failed, batch remains pending"
                    );
                    metrics::counter!("circuit_transport_send_failures_total").increment(1);
                } else {
                    metrics::counter!("circuit_batches_sent_total").increment(1);
                }
            }
            OutboundFrame::Error { message } => {
                if let Err(e) = transport.send_error(session_id, &message).await {
                    warn!(connection_id = %connection_id, error = %e, "error notification failed");
                }
                if let Err(e) = transport.close().await {
                    debug!(connection_id = %connection_id, error = %e, "transport close failed");
                }
            }
        }
    }

    debug!(connection_id = %connection_id, "outbound worker stopped");
}
