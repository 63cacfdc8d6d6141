//! Mock collaborators
//!
//! Used by unit tests, the integration-test crate, and the CLI demo host.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use contracts::{
    BatchRenderer, CircuitError, ClientCommand, ConnectionId, LifecycleObserver, SessionId,
    SessionInfo, Transport,
};

/// In-memory transport that records everything it is asked to send.
pub struct MockTransport {
    connection_id: ConnectionId,
    sent: Mutex<Vec<(u64, Bytes)>>,
    errors: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connection_id: ConnectionId::next(),
            sent: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail (batches stay pending server-side).
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Sequence numbers delivered so far, in send order.
    pub fn sent_sequences(&self) -> Vec<u64> {
        self.sent.lock().unwrap().iter().map(|(seq, _)| *seq).collect()
    }

    /// Payloads delivered so far, in send order.
    pub fn sent_payloads(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Error notifications delivered so far.
    pub fn error_notifications(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Block (async) until at least `count` batches were delivered.
    /// Panics after two seconds; sends flow through a worker task, so tests
    /// must wait rather than assert immediately.
    pub async fn wait_for_sends(&self, count: usize) {
        for _ in 0..200 {
            if self.sent.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} sends, saw {:?}",
            self.sent_sequences()
        );
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    async fn send_batch(
        &self,
        _session_id: SessionId,
        sequence: u64,
        payload: Bytes,
    ) -> Result<(), CircuitError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(CircuitError::transport_send(
                self.connection_id,
                "mock send failure",
            ));
        }
        self.sent.lock().unwrap().push((sequence, payload));
        Ok(())
    }

    async fn send_error(&self, _session_id: SessionId, message: &str) -> Result<(), CircuitError> {
        self.errors.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), CircuitError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Renderer producing a scripted list of payloads, one per render request.
///
/// `apply_command` enqueues the command payload as the next batch, which
/// makes command round-trips observable in tests.
#[derive(Default)]
pub struct ScriptedRenderer {
    queued: VecDeque<Bytes>,
}

impl ScriptedRenderer {
    /// Queue a payload for a future render.
    pub fn push(&mut self, payload: &[u8]) {
        self.queued.push_back(Bytes::copy_from_slice(payload));
    }
}

impl BatchRenderer for ScriptedRenderer {
    fn apply_command(&mut self, command: &ClientCommand) -> Result<(), CircuitError> {
        if command.payload.is_empty() {
            self.queued
                .push_back(Bytes::copy_from_slice(command.name.as_bytes()));
        } else {
            self.queued.push_back(command.payload.clone());
        }
        Ok(())
    }

    fn produce_next_batch(&mut self) -> Result<Option<Bytes>, CircuitError> {
        Ok(self.queued.pop_front())
    }
}

/// Observer that appends `"{name}:{hook}"` to a shared event log, optionally
/// failing one hook to exercise fault isolation.
pub struct RecordingObserver {
    name: String,
    events: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl RecordingObserver {
    pub fn new(name: &str, events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            events,
            fail_on: None,
        }
    }

    /// A variant whose named hook records its event and then fails.
    pub fn failing_on(name: &str, events: Arc<Mutex<Vec<String>>>, hook: &'static str) -> Self {
        Self {
            name: name.to_string(),
            events,
            fail_on: Some(hook),
        }
    }

    fn record(&self, hook: &'static str) -> Result<(), CircuitError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, hook));
        if self.fail_on == Some(hook) {
            return Err(CircuitError::observer(&self.name, hook, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl LifecycleObserver for RecordingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_opened(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        self.record("on_opened")
    }

    async fn on_connection_up(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        self.record("on_connection_up")
    }

    async fn on_connection_down(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        self.record("on_connection_down")
    }

    async fn on_closed(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        self.record("on_closed")
    }
}
