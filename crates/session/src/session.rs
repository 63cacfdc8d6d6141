//! CircuitSession - the per-client session actor
//!
//! All state here is mutated exclusively on the session's dispatcher, so no
//! field needs its own synchronization. Lifecycle hooks run inline on the
//! logical thread, in registration order, each fault-isolated.

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{
    BatchRenderer, CircuitConfig, CircuitError, ClientCommand, ConnectionId, FaultRecord,
    LifecycleObserver, SessionId, SessionInfo, SessionState, Transport,
};
use delivery::{process_ack, AckDisposition, PendingBatchQueue};
use dispatcher::{assert_on_logical_thread, Actor, Flow};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::handle::CircuitHandle;
use crate::outbound::{OutboundFrame, OutboundHandle};

/// Unit of session work scheduled onto the dispatcher.
pub enum SessionMsg {
    /// Internal: run opened hooks and admit external work
    Open,
    /// Attach (or swap) a transport connection
    Attach { transport: Arc<dyn Transport> },
    /// Transport loss notice; ignored unless it names the live connection
    ConnectionLost { connection_id: ConnectionId },
    /// Client-originated command
    Command(ClientCommand),
    /// Client acknowledgement, cumulative
    Acknowledge {
        sequence: u64,
        error: Option<String>,
    },
    /// Ask the renderer for new output
    RequestRender,
    /// Fatal fault: notify the client once, then close
    Fail { message: String },
    /// Close the session (idempotent)
    Close,
}

/// Which lifecycle hook to invoke, used for ordered observer dispatch.
#[derive(Debug, Clone, Copy)]
enum Hook {
    Opened,
    ConnectionUp,
    ConnectionDown,
    Closed,
}

impl Hook {
    fn name(&self) -> &'static str {
        match self {
            Self::Opened => "on_opened",
            Self::ConnectionUp => "on_connection_up",
            Self::ConnectionDown => "on_connection_down",
            Self::Closed => "on_closed",
        }
    }
}

pub(crate) struct CircuitSession {
    session_id: SessionId,
    state: SessionState,
    config: CircuitConfig,
    queue: PendingBatchQueue,
    renderer: Box<dyn BatchRenderer>,
    observers: Arc<[Arc<dyn LifecycleObserver>]>,
    outbound: Option<OutboundHandle>,
    /// Production hit the pending bound and must retry once the queue drains
    production_deferred: bool,
}

impl CircuitSession {
    fn new(
        session_id: SessionId,
        config: CircuitConfig,
        renderer: Box<dyn BatchRenderer>,
        observers: Arc<[Arc<dyn LifecycleObserver>]>,
    ) -> Self {
        let queue = PendingBatchQueue::new(config.max_pending_batches);
        Self {
            session_id,
            state: SessionState::Initializing,
            config,
            queue,
            renderer,
            observers,
            outbound: None,
            production_deferred: false,
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id,
            state: self.state,
        }
    }

    /// Invoke one hook on every observer, registration order, fault-isolated.
    async fn run_hooks(&self, hook: Hook) {
        let info = self.info();
        for observer in self.observers.iter() {
            let result = match hook {
                Hook::Opened => observer.on_opened(&info).await,
                Hook::ConnectionUp => observer.on_connection_up(&info).await,
                Hook::ConnectionDown => observer.on_connection_down(&info).await,
                Hook::Closed => observer.on_closed(&info).await,
            };
            if let Err(e) = result {
                // Isolated: remaining observers and the transition proceed
                warn!(
                    session_id = %self.session_id,
                    observer = observer.name(),
                    hook = hook.name(),
                    error = %e,
                    "lifecycle observer failed"
                );
                metrics::counter!("circuit_observer_faults_total").increment(1);
            }
        }
    }

    fn reject_unless_active(&self) -> Result<(), CircuitError> {
        if self.state.accepts_work() {
            Ok(())
        } else {
            Err(CircuitError::invalid_state(self.session_id, self.state))
        }
    }

    async fn handle_open(&mut self) -> Result<(), CircuitError> {
        if self.state != SessionState::Initializing {
            return Err(CircuitError::invalid_state(self.session_id, self.state));
        }
        self.state = SessionState::Open;
        self.run_hooks(Hook::Opened).await;
        info!(session_id = %self.session_id, "circuit opened");
        Ok(())
    }

    async fn handle_attach(&mut self, transport: Arc<dyn Transport>) -> Result<(), CircuitError> {
        self.reject_unless_active()?;

        let was_connected = self.state.is_connected();
        if let Some(old) = self.outbound.take() {
            // Transport swap: the old connection is dead to us either way
            warn!(
                session_id = %self.session_id,
                old_connection = %old.connection_id(),
                "replacing transport on live session"
            );
            old.abort();
        }

        let outbound = OutboundHandle::spawn(
            self.session_id,
            transport,
            self.config.outbound_queue_capacity(),
        );
        let connection_id = outbound.connection_id();
        self.outbound = Some(outbound);
        self.state = SessionState::Connected;

        if !was_connected {
            self.run_hooks(Hook::ConnectionUp).await;
        }

        // Pending batches first, oldest first, before anything new
        let snapshot = self.queue.snapshot_for_resend();
        let resent = snapshot.len();
        for batch in snapshot {
            self.send_frame(OutboundFrame::Batch {
                sequence: batch.sequence,
                payload: batch.payload,
            })
            .await;
        }
        if resent > 0 {
            metrics::counter!("circuit_batches_resent_total").increment(resent as u64);
        }
        info!(
            session_id = %self.session_id,
            connection_id = %connection_id,
            resent,
            "transport attached"
        );

        // Production may have deferred while disconnected
        self.produce_pending().await
    }

    async fn handle_connection_lost(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<(), CircuitError> {
        if self.state.is_closed() {
            return Ok(());
        }
        let current = self.outbound.as_ref().map(|o| o.connection_id());
        if !self.state.is_connected() || current != Some(connection_id) {
            debug!(
                session_id = %self.session_id,
                connection_id = %connection_id,
                "stale disconnect notice ignored"
            );
            return Ok(());
        }
        self.transition_disconnected().await;
        Ok(())
    }

    async fn transition_disconnected(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            outbound.abort();
        }
        self.state = SessionState::Disconnected;
        self.run_hooks(Hook::ConnectionDown).await;
        info!(
            session_id = %self.session_id,
            pending = self.queue.len(),
            "transport lost, session retained for reconnect"
        );
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<(), CircuitError> {
        self.reject_unless_active()?;
        assert_on_logical_thread(self.session_id)?;
        self.renderer.apply_command(&command)?;
        self.produce_pending().await
    }

    async fn handle_acknowledge(
        &mut self,
        sequence: u64,
        error: Option<String>,
    ) -> Result<(), CircuitError> {
        self.reject_unless_active()?;
        match process_ack(&mut self.queue, sequence, error) {
            AckDisposition::Ignored => Ok(()),
            AckDisposition::Advanced { removed } => {
                debug!(
                    session_id = %self.session_id,
                    sequence,
                    removed,
                    pending = self.queue.len(),
                    "acknowledgement advanced"
                );
                metrics::gauge!("circuit_pending_batches").set(self.queue.len() as f64);
                if self.production_deferred {
                    // At least one slot freed; retry the deferred production
                    self.produce_pending().await?;
                }
                Ok(())
            }
            AckDisposition::Fatal(e) => Err(e),
        }
    }

    /// Produce batches until the renderer runs dry or the queue fills.
    ///
    /// Checks `is_full` before each render so a slow client can never push
    /// the queue past its bound; a deferred render is retried from the ack
    /// path once draining occurs.
    async fn produce_pending(&mut self) -> Result<(), CircuitError> {
        loop {
            if self.queue.is_full() {
                if !self.production_deferred {
                    debug!(
                        session_id = %self.session_id,
                        pending = self.queue.len(),
                        "backpressure: deferring batch production"
                    );
                    metrics::counter!("circuit_production_deferred_total").increment(1);
                }
                self.production_deferred = true;
                return Ok(());
            }
            self.production_deferred = false;

            let Some(payload) = self.renderer.produce_next_batch()? else {
                return Ok(());
            };
            let sequence = self.queue.enqueue(&payload)?;
            metrics::counter!("circuit_batches_produced_total").increment(1);
            metrics::gauge!("circuit_pending_batches").set(self.queue.len() as f64);

            // Send the queue's snapshot, not the renderer's buffer
            let snapshot = match self.queue.back() {
                Some(batch) => batch.payload.clone(),
                None => continue,
            };
            self.send_frame(OutboundFrame::Batch {
                sequence,
                payload: snapshot,
            })
            .await;
        }
    }

    /// Hand one frame to the outbound worker, treating a wedged queue as a
    /// lost connection. No-op while disconnected.
    async fn send_frame(&mut self, frame: OutboundFrame) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        if !outbound.try_send(frame) {
            self.transition_disconnected().await;
        }
    }

    async fn handle_fail(&mut self, message: String) -> Result<(), CircuitError> {
        warn!(session_id = %self.session_id, message = %message, "fatal fault, closing session");
        self.send_frame(OutboundFrame::Error {
            message: message.clone(),
        })
        .await;
        self.close_session().await;
        Ok(())
    }

    async fn close_session(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if self.state.is_connected() {
            self.run_hooks(Hook::ConnectionDown).await;
        }
        self.state = SessionState::Closed;
        self.run_hooks(Hook::Closed).await;

        if let Some(outbound) = self.outbound.take() {
            outbound.release();
        }
        let session_id = self.session_id;
        self.queue
            .clear(|| CircuitError::DispatchCancelled { session_id });

        info!(session_id = %self.session_id, "circuit closed");
        metrics::counter!("circuit_sessions_closed_total").increment(1);
    }
}

#[async_trait]
impl Actor for CircuitSession {
    type Message = SessionMsg;

    async fn handle(&mut self, msg: SessionMsg) -> Result<Flow, CircuitError> {
        match msg {
            SessionMsg::Open => self.handle_open().await.map(|_| Flow::Continue),
            SessionMsg::Attach { transport } => {
                self.handle_attach(transport).await.map(|_| Flow::Continue)
            }
            SessionMsg::ConnectionLost { connection_id } => self
                .handle_connection_lost(connection_id)
                .await
                .map(|_| Flow::Continue),
            SessionMsg::Command(command) => {
                self.handle_command(command).await.map(|_| Flow::Continue)
            }
            SessionMsg::Acknowledge { sequence, error } => self
                .handle_acknowledge(sequence, error)
                .await
                .map(|_| Flow::Continue),
            SessionMsg::RequestRender => {
                self.reject_unless_active()?;
                self.produce_pending().await.map(|_| Flow::Continue)
            }
            SessionMsg::Fail { message } => self.handle_fail(message).await.map(|_| Flow::Stop),
            SessionMsg::Close => {
                self.close_session().await;
                Ok(Flow::Stop)
            }
        }
    }
}

/// Construct a session, spawn its dispatcher, and drive it to Open.
///
/// The opened hooks complete before this returns, so no externally triggered
/// call can observe a half-initialized session; callers publish the handle to
/// the registry only afterwards. A construction failure aborts before Open
/// and nothing is registered.
pub async fn open_circuit(
    config: CircuitConfig,
    renderer: Box<dyn BatchRenderer>,
    observers: Arc<[Arc<dyn LifecycleObserver>]>,
    fault_tx: mpsc::UnboundedSender<FaultRecord>,
) -> Result<(CircuitHandle, tokio::task::JoinHandle<()>), CircuitError> {
    if config.max_pending_batches == 0 {
        return Err(CircuitError::config_validation(
            "circuit.max_pending_batches",
            "must be at least 1",
        ));
    }
    if config.mailbox_capacity == 0 {
        return Err(CircuitError::config_validation(
            "circuit.mailbox_capacity",
            "must be at least 1",
        ));
    }

    let session_id = SessionId::next();
    let mailbox_capacity = config.mailbox_capacity;
    let session = CircuitSession::new(session_id, config, renderer, observers);
    let (handle, worker) = dispatcher::spawn(session, session_id, mailbox_capacity, fault_tx);
    let handle = CircuitHandle::new(handle);

    handle.open().await?;
    Ok((handle, worker))
}
