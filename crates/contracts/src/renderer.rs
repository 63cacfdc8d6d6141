//! BatchRenderer trait - diff producer interface

use bytes::Bytes;

use crate::{CircuitError, ClientCommand};

/// Produces raw batch payloads on demand.
///
/// Invoked only from the owning session's dispatcher, so implementations
/// need no internal synchronization; `Sync` is still required because the
/// owning session is held across awaits inside dispatched work. The payload
/// content is opaque to the delivery core.
pub trait BatchRenderer: Send + Sync {
    /// Apply a client command to application state.
    ///
    /// Default is a no-op for renderers that are pure producers.
    fn apply_command(&mut self, _command: &ClientCommand) -> Result<(), CircuitError> {
        Ok(())
    }

    /// Produce the next diff batch payload, or `None` when nothing changed.
    ///
    /// The returned bytes are handed to the pending queue as-is; the queue
    /// snapshots them, so the renderer may reuse internal buffers afterwards.
    fn produce_next_batch(&mut self) -> Result<Option<Bytes>, CircuitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_trait_object_is_thread_safe() {
        fn assert_thread_safe<T: Send + Sync + ?Sized>() {}
        assert_thread_safe::<dyn BatchRenderer>();
        assert_thread_safe::<Box<dyn BatchRenderer>>();
    }
}
