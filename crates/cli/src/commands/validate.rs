//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    max_pending_batches: usize,
    mailbox_capacity: usize,
    disconnect_grace_secs: u64,
    outbound_queue_capacity: usize,
    metrics_port: Option<u16>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let circuit = &blueprint.circuit;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    max_pending_batches: circuit.max_pending_batches,
                    mailbox_capacity: circuit.mailbox_capacity,
                    disconnect_grace_secs: circuit.disconnect_grace_secs,
                    outbound_queue_capacity: circuit.outbound_queue_capacity(),
                    metrics_port: blueprint.metrics_port,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::HostBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let circuit = &blueprint.circuit;

    if circuit.disconnect_grace_secs < 10 {
        warnings.push(format!(
            "disconnect_grace_secs is {} - clients on flaky links may be evicted mid-reconnect",
            circuit.disconnect_grace_secs
        ));
    }

    if circuit.max_pending_batches == 1 {
        warnings.push(
            "max_pending_batches is 1 - production stalls after every batch until its ack"
                .to_string(),
        );
    }

    if blueprint.metrics_port.is_none() {
        warnings.push("metrics_port not set - Prometheus exporter disabled".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Max pending batches: {}", summary.max_pending_batches);
            println!("  Mailbox capacity: {}", summary.mailbox_capacity);
            println!("  Disconnect grace: {}s", summary.disconnect_grace_secs);
            println!(
                "  Outbound queue capacity: {}",
                summary.outbound_queue_capacity
            );
            match summary.metrics_port {
                Some(port) => println!("  Metrics port: {}", port),
                None => println!("  Metrics: disabled"),
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn args_for(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: false,
        }
    }

    #[test]
    fn test_missing_file_invalid() {
        let result = validate_config(&args_for(PathBuf::from("/nonexistent/config.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_file_with_warnings() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[circuit]\ndisconnect_grace_secs = 2").unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(result.valid, "{:?}", result.error);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("disconnect_grace_secs")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "[circuit]\nmax_pending_batches = 0").unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(!result.valid);
    }
}
