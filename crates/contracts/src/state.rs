//! Session lifecycle states

use std::fmt;

use serde::{Deserialize, Serialize};

/// Circuit session lifecycle state.
///
/// Transitions: Initializing -> Open -> Connected <-> Disconnected -> Closed.
/// Closed is terminal and reached exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Constructed but opened-hooks not yet complete; external work rejected
    Initializing,
    /// Admitted, no transport ever attached
    Open,
    /// Live transport attached
    Connected,
    /// Transport lost, pending batches retained, awaiting reconnect
    Disconnected,
    /// Terminal; all further operations fail without side effects
    Closed,
}

impl SessionState {
    /// Whether externally triggered work (commands, acks, renders) is admitted.
    #[inline]
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Open | Self::Connected | Self::Disconnected)
    }

    /// Whether a transport is currently attached.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the session has reached its terminal state.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Open => "open",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_work() {
        assert!(!SessionState::Initializing.accepts_work());
        assert!(SessionState::Open.accepts_work());
        assert!(SessionState::Connected.accepts_work());
        assert!(SessionState::Disconnected.accepts_work());
        assert!(!SessionState::Closed.accepts_work());
    }
}
