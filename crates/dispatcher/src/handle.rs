//! DispatcherHandle - scheduling surface for callers on arbitrary threads

use std::sync::Arc;

use contracts::{CircuitError, SessionId};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::dispatcher::Envelope;
use crate::metrics::DispatcherMetrics;

/// Cloneable handle for scheduling work onto a session's logical thread.
pub struct DispatcherHandle<M> {
    session_id: SessionId,
    tx: mpsc::Sender<Envelope<M>>,
    metrics: Arc<DispatcherMetrics>,
}

// Derived Clone would require M: Clone; the handle never owns an M.
impl<M> Clone for DispatcherHandle<M> {
    fn clone(&self) -> Self {
        Self {
            session_id: self.session_id,
            tx: self.tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<M: Send + 'static> DispatcherHandle<M> {
    pub(crate) fn new(
        session_id: SessionId,
        tx: mpsc::Sender<Envelope<M>>,
        metrics: Arc<DispatcherMetrics>,
    ) -> Self {
        Self {
            session_id,
            tx,
            metrics,
        }
    }

    /// Session this dispatcher serves.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Shared dispatcher metrics.
    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        &self.metrics
    }

    /// Whether the worker has stopped accepting work.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Enqueue a unit of work and return its completion signal.
    ///
    /// Two schedules from the same caller observe program order; fairness
    /// across callers is not guaranteed.
    ///
    /// # Errors
    /// `DispatcherClosed` if the worker has already stopped.
    pub async fn schedule(&self, msg: M) -> Result<Completion, CircuitError> {
        let (done_tx, done_rx) = oneshot::channel();
        let envelope = Envelope {
            msg,
            completion: Some(done_tx),
        };
        self.tx
            .send(envelope)
            .await
            .map_err(|_| CircuitError::DispatcherClosed {
                session_id: self.session_id,
            })?;
        self.metrics.inc_scheduled_count();
        Ok(Completion {
            session_id: self.session_id,
            rx: done_rx,
        })
    }

    /// Enqueue fire-and-forget work; a handler failure is routed to the
    /// session fault channel instead of being dropped.
    pub async fn notify(&self, msg: M) -> Result<(), CircuitError> {
        let envelope = Envelope {
            msg,
            completion: None,
        };
        self.tx
            .send(envelope)
            .await
            .map_err(|_| CircuitError::DispatcherClosed {
                session_id: self.session_id,
            })?;
        self.metrics.inc_scheduled_count();
        Ok(())
    }

    /// Non-blocking fire-and-forget. Returns false when the mailbox is full
    /// or the worker stopped; the caller decides whether that matters.
    pub fn try_notify(&self, msg: M) -> bool {
        let envelope = Envelope {
            msg,
            completion: None,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => {
                self.metrics.inc_scheduled_count();
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %self.session_id, "dispatcher mailbox full, notification dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Completion signal for one scheduled unit of work.
///
/// Resolves after the unit executed on the logical thread, carrying the
/// handler's result; resolves with `DispatchCancelled` if the session closed
/// before the unit ran.
pub struct Completion {
    session_id: SessionId,
    rx: oneshot::Receiver<Result<(), CircuitError>>,
}

impl Completion {
    /// Await execution of the scheduled unit.
    pub async fn wait(self) -> Result<(), CircuitError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(CircuitError::DispatchCancelled {
                session_id: self.session_id,
            }),
        }
    }
}
