//! Host configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-circuit delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CircuitConfig {
    /// Maximum produced-but-unacknowledged batches before production defers
    #[serde(default = "default_max_pending_batches")]
    #[validate(range(min = 1))]
    pub max_pending_batches: usize,

    /// Dispatcher mailbox capacity (scheduled units of work)
    #[serde(default = "default_mailbox_capacity")]
    #[validate(range(min = 1))]
    pub mailbox_capacity: usize,

    /// Grace period between disconnect and eviction, in seconds
    #[serde(default = "default_disconnect_grace_secs")]
    #[validate(range(min = 1))]
    pub disconnect_grace_secs: u64,
}

fn default_max_pending_batches() -> usize {
    10
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_disconnect_grace_secs() -> u64 {
    180
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            max_pending_batches: default_max_pending_batches(),
            mailbox_capacity: default_mailbox_capacity(),
            disconnect_grace_secs: default_disconnect_grace_secs(),
        }
    }
}

impl CircuitConfig {
    /// Outbound send-queue capacity for one connection.
    ///
    /// At most `max_pending_batches` batches can ever be in flight
    /// unacknowledged, so this queue cannot fill in normal operation; the
    /// headroom absorbs a resend racing new production.
    pub fn outbound_queue_capacity(&self) -> usize {
        self.max_pending_batches + 4
    }
}

/// Top-level host configuration (one file per process).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HostBlueprint {
    /// Delivery configuration applied to every circuit
    #[serde(default)]
    #[validate(nested)]
    pub circuit: CircuitConfig,

    /// Prometheus exporter port (absent = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CircuitConfig::default();
        assert_eq!(config.max_pending_batches, 10);
        assert!(config.outbound_queue_capacity() > config.max_pending_batches);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_pending() {
        let config = CircuitConfig {
            max_pending_batches: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blueprint_toml_roundtrip() {
        let content = r#"
metrics_port = 9000

[circuit]
max_pending_batches = 3
disconnect_grace_secs = 30
"#;
        let blueprint: HostBlueprint = toml::from_str(content).unwrap();
        assert_eq!(blueprint.circuit.max_pending_batches, 3);
        assert_eq!(blueprint.circuit.disconnect_grace_secs, 30);
        // Omitted field falls back to its default
        assert_eq!(blueprint.circuit.mailbox_capacity, 64);
        assert_eq!(blueprint.metrics_port, Some(9000));
    }
}
