//! LifecycleObserver trait - ordered lifecycle hooks
//!
//! Observers are registered once per session at creation and invoked in
//! registration order for every lifecycle event. Each invocation is
//! individually fault-isolated: a failing hook is logged and neither the
//! remaining observers nor the transition itself are aborted.

use async_trait::async_trait;

use crate::{CircuitError, SessionId, SessionState};

/// Read-only session snapshot handed to lifecycle hooks.
#[derive(Debug, Clone, Copy)]
pub struct SessionInfo {
    /// Session identity
    pub session_id: SessionId,

    /// State the session is transitioning into
    pub state: SessionState,
}

/// Ordered lifecycle hooks, shared across sessions.
///
/// All hooks default to no-ops so observers implement only the events they
/// care about. Hooks run on the session's dispatcher; they must not block.
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Observer name for logging.
    fn name(&self) -> &str;

    /// Session admitted (Initializing -> Open), before any external work.
    async fn on_opened(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        Ok(())
    }

    /// Transport attached (Open/Disconnected -> Connected).
    async fn on_connection_up(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        Ok(())
    }

    /// Transport lost (Connected -> Disconnected), session persists.
    async fn on_connection_down(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        Ok(())
    }

    /// Session closed (terminal). Runs after `on_connection_down` if the
    /// session was connected when close began.
    async fn on_closed(&self, _session: &SessionInfo) -> Result<(), CircuitError> {
        Ok(())
    }
}
