//! CircuitRegistry - process-wide directory of live sessions
//!
//! The only resource mutated by more than one session concurrently. The
//! table mutex is held for map operations only, never across an await, so
//! registry traffic for one session cannot serialize on another session's
//! dispatcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{
    BatchRenderer, CircuitConfig, CircuitError, ClientCommand, ConnectionId, FaultRecord,
    LifecycleObserver, SessionId, Transport,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::handle::CircuitHandle;
use crate::session::open_circuit;

struct Entry {
    handle: CircuitHandle,
    /// Dispatcher worker, reaped on removal
    worker: Option<JoinHandle<()>>,
    /// Bumped on every connect/disconnect so a stale eviction timer
    /// cannot evict a session that reconnected after it was armed
    epoch: u64,
    connected: bool,
    /// Id of the currently attached transport. Disconnect notices naming
    /// any other connection are stale and must not arm the eviction timer.
    connection: Option<ConnectionId>,
}

/// Process-wide table of live circuits.
pub struct CircuitRegistry {
    config: CircuitConfig,
    observers: Arc<[Arc<dyn LifecycleObserver>]>,
    sessions: Mutex<HashMap<SessionId, Entry>>,
}

impl CircuitRegistry {
    pub fn new(
        config: CircuitConfig,
        observers: Arc<[Arc<dyn LifecycleObserver>]>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            observers,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Grace period between disconnect and eviction.
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.config.disconnect_grace_secs)
    }

    /// Closed sessions leave the table, so any later call through the
    /// registry fails with `UnknownSession`. Only a caller racing the close
    /// itself can still reach the session and see `InvalidSessionState`.
    fn lookup(&self, session_id: SessionId) -> Result<CircuitHandle, CircuitError> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session_id)
            .map(|entry| entry.handle.clone())
            .ok_or(CircuitError::UnknownSession { session_id })
    }

    /// Open a new circuit and publish it for lookup.
    ///
    /// The session reaches Open (all opened hooks complete) before it is
    /// registered, so no externally triggered call can observe a
    /// half-initialized session.
    #[instrument(name = "registry_create_session", skip_all)]
    pub async fn create_session(
        self: &Arc<Self>,
        renderer: Box<dyn BatchRenderer>,
    ) -> Result<SessionId, CircuitError> {
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let (handle, worker) = open_circuit(
            self.config.clone(),
            renderer,
            Arc::clone(&self.observers),
            fault_tx,
        )
        .await?;
        let session_id = handle.session_id();

        self.sessions.lock().unwrap().insert(
            session_id,
            Entry {
                handle,
                worker: Some(worker),
                epoch: 0,
                connected: false,
                connection: None,
            },
        );

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.drain_faults(session_id, fault_rx).await;
        });

        info!(session_id = %session_id, "session registered");
        Ok(session_id)
    }

    /// Rebind a transport to an existing session, driving it (back) to
    /// Connected and cancelling any armed eviction timer.
    ///
    /// `None` means the session was evicted or never existed — an expected,
    /// recoverable outcome; the client must start a fresh session.
    pub async fn reconnect(
        self: &Arc<Self>,
        session_id: SessionId,
        transport: Arc<dyn Transport>,
    ) -> Option<CircuitHandle> {
        let connection_id = transport.connection_id();
        let handle = {
            let mut sessions = self.sessions.lock().unwrap();
            let entry = sessions.get_mut(&session_id)?;
            entry.epoch += 1;
            entry.connected = true;
            entry.connection = Some(connection_id);
            entry.handle.clone()
        };

        match handle.attach_transport(transport).await {
            Ok(()) => Some(handle),
            Err(e) => {
                // Session closed under us; reap the stale entry
                debug!(session_id = %session_id, error = %e, "reconnect raced session close");
                self.remove(session_id).await;
                None
            }
        }
    }

    /// Exposed surface: attach a transport, true on success.
    pub async fn attach_transport(
        self: &Arc<Self>,
        session_id: SessionId,
        transport: Arc<dyn Transport>,
    ) -> bool {
        self.reconnect(session_id, transport).await.is_some()
    }

    /// Transport loss: mark Disconnected and arm the eviction timer.
    ///
    /// A notice naming a connection that has already been replaced is
    /// dropped here; the session stays Connected and no timer is armed.
    #[instrument(name = "registry_disconnect", skip(self), fields(session_id = %session_id))]
    pub async fn disconnect(self: &Arc<Self>, session_id: SessionId, connection_id: ConnectionId) {
        let armed = {
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.get_mut(&session_id) {
                Some(entry) if entry.connection == Some(connection_id) => {
                    entry.epoch += 1;
                    entry.connected = false;
                    entry.connection = None;
                    Some((entry.handle.clone(), entry.epoch))
                }
                Some(_) => {
                    debug!(connection_id = %connection_id, "stale disconnect notice ignored");
                    None
                }
                None => None,
            }
        };
        let Some((handle, epoch)) = armed else {
            return;
        };

        let _ = handle.connection_lost(connection_id).await;

        let registry = Arc::clone(self);
        let grace = self.grace_period();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.evict_if_stale(session_id, epoch).await;
        });
    }

    /// Timer body: evict only if no reconnect happened since the timer armed.
    async fn evict_if_stale(&self, session_id: SessionId, epoch: u64) {
        let evicted = {
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.get(&session_id) {
                Some(entry) if entry.epoch == epoch && !entry.connected => {
                    sessions.remove(&session_id)
                }
                _ => None,
            }
        };
        let Some(entry) = evicted else {
            return;
        };

        info!(session_id = %session_id, "grace period expired, evicting session");
        metrics::counter!("circuit_sessions_evicted_total").increment(1);
        let _ = entry.handle.close().await;
        Self::reap(session_id, entry.worker).await;
    }

    /// Route a client command to the session's dispatcher.
    pub async fn submit_command(
        &self,
        session_id: SessionId,
        command: ClientCommand,
    ) -> Result<(), CircuitError> {
        self.lookup(session_id)?.submit_command(command).await
    }

    /// Apply a client acknowledgement (fire-and-forget).
    pub async fn acknowledge(
        &self,
        session_id: SessionId,
        sequence: u64,
        error: Option<String>,
    ) -> Result<(), CircuitError> {
        self.lookup(session_id)?.acknowledge(sequence, error).await
    }

    /// Ask the session's renderer for new output.
    pub async fn request_render(&self, session_id: SessionId) -> Result<(), CircuitError> {
        self.lookup(session_id)?.request_render().await
    }

    /// Close and remove a session. Unknown ids are a no-op, matching close
    /// idempotence from the caller's perspective.
    pub async fn close(&self, session_id: SessionId) -> Result<(), CircuitError> {
        if let Some((handle, worker)) = self.take(session_id) {
            handle.close().await?;
            Self::reap(session_id, worker).await;
        }
        Ok(())
    }

    /// Close every registered session (host shutdown).
    pub async fn close_all(&self) {
        let drained: Vec<(SessionId, CircuitHandle, Option<JoinHandle<()>>)> = {
            let mut sessions = self.sessions.lock().unwrap();
            sessions
                .drain()
                .map(|(id, entry)| (id, entry.handle, entry.worker))
                .collect()
        };
        for (session_id, handle, worker) in drained {
            if let Err(e) = handle.close().await {
                warn!(session_id = %session_id, error = %e, "close failed during shutdown");
            }
            Self::reap(session_id, worker).await;
        }
    }

    fn take(&self, session_id: SessionId) -> Option<(CircuitHandle, Option<JoinHandle<()>>)> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .remove(&session_id)
            .map(|entry| (entry.handle, entry.worker))
    }

    async fn remove(&self, session_id: SessionId) {
        if let Some((_, worker)) = self.take(session_id) {
            Self::reap(session_id, worker).await;
        }
    }

    async fn reap(session_id: SessionId, worker: Option<JoinHandle<()>>) {
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    warn!(session_id = %session_id, error = ?e, "session worker panicked");
                }
            }
        }
    }

    /// Drain one session's fault channel. Non-fatal faults are logged;
    /// a fatal fault notifies the client once, then forces the session
    /// closed and removes it.
    async fn drain_faults(
        self: Arc<Self>,
        session_id: SessionId,
        mut fault_rx: mpsc::UnboundedReceiver<FaultRecord>,
    ) {
        while let Some(fault) = fault_rx.recv().await {
            warn!(
                session_id = %session_id,
                kind = ?fault.kind,
                message = %fault.message,
                "session fault"
            );
            metrics::counter!("circuit_faults_total").increment(1);

            if fault.kind.is_fatal() {
                if let Ok(handle) = self.lookup(session_id) {
                    // Fail sends the error notification and stops the actor
                    let _ = handle.fail(fault.message).await;
                }
                self.remove(session_id).await;
                // The dispatcher is gone; the channel closes shortly
            }
        }
        debug!(session_id = %session_id, "fault channel drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, ScriptedRenderer};

    fn registry_with_grace(grace_secs: u64) -> Arc<CircuitRegistry> {
        let config = CircuitConfig {
            max_pending_batches: 4,
            disconnect_grace_secs: grace_secs,
            ..Default::default()
        };
        CircuitRegistry::new(config, Arc::from(Vec::<Arc<dyn LifecycleObserver>>::new()))
    }

    #[tokio::test]
    async fn test_create_and_lookup_roundtrip() {
        let registry = registry_with_grace(60);
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();
        assert_eq!(registry.session_count(), 1);

        let unknown = SessionId::next();
        assert!(matches!(
            registry.submit_command(unknown, ClientCommand::named("x")).await,
            Err(CircuitError::UnknownSession { .. })
        ));

        registry.close(id).await.unwrap();
        assert_eq!(registry.session_count(), 0);
        // Closing again is a no-op
        registry.close(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_unknown_is_absent_not_error() {
        let registry = registry_with_grace(60);
        let transport = Arc::new(MockTransport::new());
        assert!(registry
            .reconnect(SessionId::next(), transport)
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_after_grace_period() {
        let registry = registry_with_grace(5);
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, Arc::clone(&transport) as _).await);
        registry.disconnect(id, transport.connection_id()).await;

        // Still present inside the grace period
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(registry.session_count(), 1);

        tokio::time::sleep(Duration::from_secs(4)).await;
        // Timer fired: session closed and removed
        assert_eq!(registry.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_cancels_eviction() {
        let registry = registry_with_grace(5);
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();

        let first = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, Arc::clone(&first) as _).await);
        registry.disconnect(id, first.connection_id()).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        let second = Arc::new(MockTransport::new());
        assert!(registry.reconnect(id, Arc::clone(&second) as _).await.is_some());

        // The stale timer fires but must not evict the reconnected session
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_disconnect_does_not_arm_eviction() {
        let registry = registry_with_grace(5);
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();

        let first = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, Arc::clone(&first) as _).await);
        let second = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, Arc::clone(&second) as _).await);

        // Late notice from the replaced connection must be dropped
        registry.disconnect(id, first.connection_id()).await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(registry.session_count(), 1);
        // The session still serves work on the live connection
        registry.request_render(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_fatal_fault_notifies_client_and_removes_session() {
        let registry = registry_with_grace(60);
        let mut renderer = ScriptedRenderer::default();
        renderer.push(b"b1");
        let id = registry.create_session(Box::new(renderer)).await.unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, Arc::clone(&transport) as _).await);
        registry.request_render(id).await.unwrap();
        transport.wait_for_sends(1).await;

        // Out-of-range ack: protocol violation, fatal
        registry.acknowledge(id, 42, None).await.unwrap();

        // The fault drain closes and removes the session
        for _ in 0..200 {
            if registry.session_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.session_count(), 0);
        assert_eq!(transport.error_notifications().len(), 1);
        assert!(transport.is_closed());
    }
}
