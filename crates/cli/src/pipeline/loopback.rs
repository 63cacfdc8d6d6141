//! Loopback collaborators for the demo host.
//!
//! The loopback transport short-circuits the wire: every delivered batch is
//! fed back to an in-process client task, which acknowledges it through the
//! registry exactly like a remote client would.

use async_trait::async_trait;
use bytes::Bytes;
use contracts::{
    BatchRenderer, CircuitError, ClientCommand, ConnectionId, LifecycleObserver, SessionId,
    SessionInfo, Transport,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A batch as observed by the loopback client.
#[derive(Debug)]
pub struct Delivered {
    pub session_id: SessionId,
    pub sequence: u64,
}

/// Transport that forwards deliveries to the in-process client channel.
pub struct LoopbackTransport {
    connection_id: ConnectionId,
    delivered_tx: mpsc::UnboundedSender<Delivered>,
}

impl LoopbackTransport {
    pub fn new(delivered_tx: mpsc::UnboundedSender<Delivered>) -> Self {
        Self {
            connection_id: ConnectionId::next(),
            delivered_tx,
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    async fn send_batch(
        &self,
        session_id: SessionId,
        sequence: u64,
        payload: Bytes,
    ) -> Result<(), CircuitError> {
        debug!(
            session_id = %session_id,
            sequence,
            bytes = payload.len(),
            "loopback delivery"
        );
        self.delivered_tx
            .send(Delivered {
                session_id,
                sequence,
            })
            .map_err(|_| {
                CircuitError::transport_send(self.connection_id, "loopback client gone")
            })
    }

    async fn send_error(&self, session_id: SessionId, message: &str) -> Result<(), CircuitError> {
        warn!(session_id = %session_id, message, "loopback error notification");
        Ok(())
    }

    async fn close(&self) -> Result<(), CircuitError> {
        debug!(connection_id = %self.connection_id, "loopback connection closed");
        Ok(())
    }
}

/// Renderer producing numbered payloads up to an optional budget.
///
/// Production is pulled, so a generous budget simply rides the pending-queue
/// backpressure: the queue fills, production defers, and each ack pulls the
/// next batch. Commands rename the payload label, which makes the command
/// path visible in delivered output.
pub struct CounterRenderer {
    label: String,
    produced: u64,
    budget: Option<u64>,
}

impl CounterRenderer {
    /// `budget` of `None` produces forever.
    pub fn new(budget: Option<u64>) -> Self {
        Self {
            label: "batch".to_string(),
            produced: 0,
            budget,
        }
    }
}

impl BatchRenderer for CounterRenderer {
    fn apply_command(&mut self, command: &ClientCommand) -> Result<(), CircuitError> {
        self.label = command.name.clone();
        Ok(())
    }

    fn produce_next_batch(&mut self) -> Result<Option<Bytes>, CircuitError> {
        if let Some(budget) = self.budget {
            if self.produced >= budget {
                return Ok(None);
            }
        }
        self.produced += 1;
        let payload = format!("{} #{}", self.label, self.produced);
        Ok(Some(Bytes::from(payload)))
    }
}

/// Observer that narrates lifecycle transitions to the log.
pub struct LogObserver;

#[async_trait]
impl LifecycleObserver for LogObserver {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_opened(&self, session: &SessionInfo) -> Result<(), CircuitError> {
        info!(session_id = %session.session_id, "session opened");
        Ok(())
    }

    async fn on_connection_up(&self, session: &SessionInfo) -> Result<(), CircuitError> {
        info!(session_id = %session.session_id, "connection up");
        Ok(())
    }

    async fn on_connection_down(&self, session: &SessionInfo) -> Result<(), CircuitError> {
        info!(session_id = %session.session_id, "connection down");
        Ok(())
    }

    async fn on_closed(&self, session: &SessionInfo) -> Result<(), CircuitError> {
        info!(session_id = %session.session_id, "session closed");
        Ok(())
    }
}
