//! Fault records - typed unhandled-fault notifications
//!
//! Failures raised inside dispatched work are never thrown back into
//! unrelated callers; they are pushed onto the session's fault channel as
//! records and drained by the hosting layer.

use crate::{CircuitError, SessionId};

/// Classification of an unhandled session fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Client broke the acknowledgement protocol; session must close
    ProtocolViolation,
    /// Work ran off the session's logical thread; session must close
    ThreadAffinity,
    /// Fire-and-forget work failed; logged, session survives
    TaskFailed,
}

impl FaultKind {
    /// Fatal faults force the session closed after client notification.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolViolation | Self::ThreadAffinity)
    }
}

/// One unhandled fault raised by dispatched session work.
#[derive(Debug)]
pub struct FaultRecord {
    /// Session the fault belongs to
    pub session_id: SessionId,

    /// Classification, drives the hosting layer's response
    pub kind: FaultKind,

    /// Human-readable description (sent to the client for fatal faults)
    pub message: String,
}

impl FaultRecord {
    /// Classify an error raised by fire-and-forget dispatched work.
    pub fn from_error(session_id: SessionId, error: &CircuitError) -> Self {
        let kind = match error {
            CircuitError::OutOfRangeAcknowledgement { .. } => FaultKind::ProtocolViolation,
            CircuitError::ThreadAffinityViolation { .. } => FaultKind::ThreadAffinity,
            _ => FaultKind::TaskFailed,
        };
        Self {
            session_id,
            kind,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionState;

    #[test]
    fn test_fatal_classification() {
        let id = SessionId::next();
        let fault = FaultRecord::from_error(
            id,
            &CircuitError::OutOfRangeAcknowledgement {
                acked: 9,
                highest: 3,
            },
        );
        assert_eq!(fault.kind, FaultKind::ProtocolViolation);
        assert!(fault.kind.is_fatal());

        let fault = FaultRecord::from_error(id, &CircuitError::invalid_state(id, SessionState::Closed));
        assert_eq!(fault.kind, FaultKind::TaskFailed);
        assert!(!fault.kind.is_fatal());
    }
}
