//! Transport trait - outbound connection interface
//!
//! Defines the abstract interface for one client-facing connection. The
//! session treats sends as fire-and-forget: a failure is logged and the batch
//! stays pending for resend on the next connect.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{CircuitError, ConnectionId, SessionId};

/// One message-based connection to the remote client.
///
/// A session holds at most one transport at a time and exclusively decides
/// its liveness; the transport instance itself is supplied by the hosting
/// layer. Inbound traffic (acks, commands) does not flow through this trait:
/// the hosting layer parses raw messages and calls the registry surface.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identity of this connection, used to discard stale disconnect notices.
    fn connection_id(&self) -> ConnectionId;

    /// Deliver one batch to the client.
    ///
    /// # Errors
    /// A failed send is not fatal to the session; the batch remains pending.
    async fn send_batch(
        &self,
        session_id: SessionId,
        sequence: u64,
        payload: Bytes,
    ) -> Result<(), CircuitError>;

    /// Deliver a terminal error notification (sent once, before forced close).
    async fn send_error(&self, session_id: SessionId, message: &str) -> Result<(), CircuitError>;

    /// Tear the connection down at the transport level.
    async fn close(&self) -> Result<(), CircuitError>;
}
