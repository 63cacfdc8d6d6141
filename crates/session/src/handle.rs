//! CircuitHandle - cloneable session surface for the hosting layer
//!
//! Every operation routes through the session's dispatcher; nothing here
//! touches session state directly.

use std::sync::Arc;

use contracts::{CircuitError, ClientCommand, ConnectionId, SessionId, Transport};
use dispatcher::{DispatcherHandle, DispatcherMetrics};

use crate::session::SessionMsg;

/// Handle to a live circuit session.
#[derive(Clone)]
pub struct CircuitHandle {
    dispatcher: DispatcherHandle<SessionMsg>,
}

impl CircuitHandle {
    pub(crate) fn new(dispatcher: DispatcherHandle<SessionMsg>) -> Self {
        Self { dispatcher }
    }

    pub fn session_id(&self) -> SessionId {
        self.dispatcher.session_id()
    }

    /// Whether the session's dispatcher has stopped (session closed).
    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }

    /// Dispatcher metrics for this session.
    pub fn metrics(&self) -> &Arc<DispatcherMetrics> {
        self.dispatcher.metrics()
    }

    /// Drive Initializing -> Open; called once by `open_circuit`.
    pub(crate) async fn open(&self) -> Result<(), CircuitError> {
        self.dispatcher.schedule(SessionMsg::Open).await?.wait().await
    }

    /// Attach (or swap) a transport; pending batches are resent oldest-first
    /// before any new batch. Completes after the attach executed.
    pub async fn attach_transport(&self, transport: Arc<dyn Transport>) -> Result<(), CircuitError> {
        self.dispatcher
            .schedule(SessionMsg::Attach { transport })
            .await?
            .wait()
            .await
    }

    /// Report transport loss for a specific connection; stale notices are
    /// ignored by the session.
    pub async fn connection_lost(&self, connection_id: ConnectionId) -> Result<(), CircuitError> {
        self.dispatcher
            .notify(SessionMsg::ConnectionLost { connection_id })
            .await
    }

    /// Route a client command onto the logical thread and await its result,
    /// so `InvalidSessionState` reaches the caller.
    pub async fn submit_command(&self, command: ClientCommand) -> Result<(), CircuitError> {
        self.dispatcher
            .schedule(SessionMsg::Command(command))
            .await?
            .wait()
            .await
    }

    /// Fire-and-forget cumulative acknowledgement. A protocol violation
    /// surfaces on the session's fault channel, not here.
    pub async fn acknowledge(&self, sequence: u64, error: Option<String>) -> Result<(), CircuitError> {
        self.dispatcher
            .notify(SessionMsg::Acknowledge { sequence, error })
            .await
    }

    /// Ask the renderer for new output (fire-and-forget).
    pub async fn request_render(&self) -> Result<(), CircuitError> {
        self.dispatcher.notify(SessionMsg::RequestRender).await
    }

    /// As [`Self::request_render`], but awaits execution. Used where the
    /// caller needs production to have happened (tests, demo host).
    pub async fn render_now(&self) -> Result<(), CircuitError> {
        self.dispatcher
            .schedule(SessionMsg::RequestRender)
            .await?
            .wait()
            .await
    }

    /// Fatal fault path: notify the client once, then close.
    pub async fn fail(&self, message: String) -> Result<(), CircuitError> {
        self.dispatcher.notify(SessionMsg::Fail { message }).await
    }

    /// Close the session. Idempotent: closing an already-closed session is a
    /// no-op, and concurrent closes collapse into one transition.
    pub async fn close(&self) -> Result<(), CircuitError> {
        match self.dispatcher.schedule(SessionMsg::Close).await {
            Ok(completion) => match completion.wait().await {
                Ok(()) => Ok(()),
                // A second close queued behind the first gets cancelled
                Err(CircuitError::DispatchCancelled { .. }) => Ok(()),
                Err(e) => Err(e),
            },
            Err(CircuitError::DispatcherClosed { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
