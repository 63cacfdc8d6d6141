//! Configuration validation
//!
//! Rules:
//! - derive-level bounds (via the `validator` crate) pass
//! - max_pending_batches >= 1 (backpressure needs at least one slot)
//! - disconnect_grace_secs >= 1
//! - mailbox_capacity large enough to absorb an ack burst at the pending bound

use contracts::{CircuitError, HostBlueprint};
use validator::Validate;

/// Validate a HostBlueprint.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &HostBlueprint) -> Result<(), CircuitError> {
    validate_derived(blueprint)?;
    validate_mailbox(blueprint)?;
    Ok(())
}

/// Run the derive-level range checks and map them onto the error type.
fn validate_derived(blueprint: &HostBlueprint) -> Result<(), CircuitError> {
    blueprint.validate().map_err(|e| {
        let field = e
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "blueprint".to_string());
        CircuitError::config_validation(field, e.to_string())
    })
}

/// The mailbox must hold at least one ack per pending batch plus control
/// traffic, or a full pending queue can starve the very acks that drain it.
fn validate_mailbox(blueprint: &HostBlueprint) -> Result<(), CircuitError> {
    let circuit = &blueprint.circuit;
    if circuit.mailbox_capacity < circuit.max_pending_batches {
        return Err(CircuitError::config_validation(
            "circuit.mailbox_capacity",
            format!(
                "mailbox_capacity ({}) must be >= max_pending_batches ({})",
                circuit.mailbox_capacity, circuit.max_pending_batches
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::CircuitConfig;

    fn blueprint(circuit: CircuitConfig) -> HostBlueprint {
        HostBlueprint {
            circuit,
            metrics_port: None,
        }
    }

    #[test]
    fn test_default_blueprint_valid() {
        assert!(validate(&HostBlueprint::default()).is_ok());
    }

    #[test]
    fn test_zero_pending_rejected() {
        let result = validate(&blueprint(CircuitConfig {
            max_pending_batches: 0,
            ..Default::default()
        }));
        assert!(matches!(result, Err(CircuitError::ConfigValidation { .. })));
    }

    #[test]
    fn test_undersized_mailbox_rejected() {
        let result = validate(&blueprint(CircuitConfig {
            max_pending_batches: 100,
            mailbox_capacity: 8,
            ..Default::default()
        }));
        match result {
            Err(CircuitError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "circuit.mailbox_capacity");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
