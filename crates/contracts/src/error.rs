//! Layered error definitions
//!
//! Categorized by source: config / dispatch / protocol / transport / observer

use thiserror::Error;

use crate::{ConnectionId, SessionId, SessionState};

/// Unified error type
#[derive(Debug, Error)]
pub enum CircuitError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Dispatch Errors =====
    /// Work executed outside the session's logical thread
    #[error("thread affinity violation: work for {session_id} ran off its dispatcher")]
    ThreadAffinityViolation { session_id: SessionId },

    /// Scheduled work was cancelled before (or instead of) executing
    #[error("dispatched work for {session_id} was cancelled")]
    DispatchCancelled { session_id: SessionId },

    /// The session's dispatcher mailbox is gone (session closed or closing)
    #[error("dispatcher for {session_id} is no longer accepting work")]
    DispatcherClosed { session_id: SessionId },

    // ===== Session / Protocol Errors =====
    /// Caller addressed a session in a state that rejects the operation
    #[error("invalid session state for {session_id}: {state}")]
    InvalidSessionState {
        session_id: SessionId,
        state: SessionState,
    },

    /// No session with that id (never existed, or evicted)
    #[error("unknown session: {session_id}")]
    UnknownSession { session_id: SessionId },

    /// Client acknowledged a batch that was never produced. Fatal.
    #[error("out-of-range acknowledgement: acked {acked}, highest produced {highest}")]
    OutOfRangeAcknowledgement { acked: u64, highest: u64 },

    /// Producer tried to enqueue past the configured pending maximum
    #[error("pending batch queue full: {pending} of {max} batches unacknowledged")]
    QueueFull { pending: usize, max: usize },

    // ===== Transport Errors =====
    /// Send attempt failed; the batch stays pending for resend
    #[error("transport send failed on {connection_id}: {message}")]
    TransportSend {
        connection_id: ConnectionId,
        message: String,
    },

    // ===== Observer Errors =====
    /// A lifecycle hook failed; isolated, never aborts the transition
    #[error("observer '{observer}' failed in {hook}: {message}")]
    Observer {
        observer: String,
        hook: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl CircuitError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid-session-state error
    pub fn invalid_state(session_id: SessionId, state: SessionState) -> Self {
        Self::InvalidSessionState { session_id, state }
    }

    /// Create transport send error
    pub fn transport_send(connection_id: ConnectionId, message: impl Into<String>) -> Self {
        Self::TransportSend {
            connection_id,
            message: message.into(),
        }
    }

    /// Create observer fault error
    pub fn observer(
        observer: impl Into<String>,
        hook: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Observer {
            observer: observer.into(),
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Whether this error must tear the session down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ThreadAffinityViolation { .. } | Self::OutOfRangeAcknowledgement { .. }
        )
    }
}
