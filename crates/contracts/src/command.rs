//! Client-originated commands
//!
//! The hosting layer parses raw transport messages into structured commands
//! before they reach a session; the session never sees wire bytes.

use bytes::Bytes;

/// An externally triggered unit of work routed onto a session's dispatcher.
///
/// The command body is opaque to the delivery core; the renderer interprets
/// it as application input.
#[derive(Debug, Clone)]
pub struct ClientCommand {
    /// Command name (e.g. an event identifier)
    pub name: String,

    /// Opaque argument payload
    pub payload: Bytes,
}

impl ClientCommand {
    /// Build a command with an empty payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Bytes::new(),
        }
    }

    /// Build a command carrying an argument payload.
    pub fn with_payload(name: impl Into<String>, payload: Bytes) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
