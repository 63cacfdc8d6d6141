//! Logical-thread affinity tracking
//!
//! The dispatcher worker runs inside a task-local scope naming its session.
//! Components that must only execute inside dispatched work call
//! [`assert_on_logical_thread`] defensively.

use contracts::{CircuitError, SessionId};

tokio::task_local! {
    /// Session whose dispatcher is executing on the current task
    pub(crate) static CURRENT_SESSION: SessionId;
}

/// Whether the current task is the given session's logical thread.
pub fn on_logical_thread(session_id: SessionId) -> bool {
    CURRENT_SESSION
        .try_with(|current| *current == session_id)
        .unwrap_or(false)
}

/// Fail with `ThreadAffinityViolation` unless running on the session's
/// logical thread.
pub fn assert_on_logical_thread(session_id: SessionId) -> Result<(), CircuitError> {
    if on_logical_thread(session_id) {
        Ok(())
    } else {
        Err(CircuitError::ThreadAffinityViolation { session_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outside_scope_is_violation() {
        let id = SessionId::next();
        assert!(!on_logical_thread(id));
        assert!(matches!(
            assert_on_logical_thread(id),
            Err(CircuitError::ThreadAffinityViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_inside_scope_passes() {
        let id = SessionId::next();
        let other = SessionId::next();
        CURRENT_SESSION
            .scope(id, async {
                assert!(on_logical_thread(id));
                assert!(assert_on_logical_thread(id).is_ok());
                // A different session's check still fails here
                assert!(assert_on_logical_thread(other).is_err());
            })
            .await;
    }
}
