//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{DemoHost, HostConfig};

/// Execute the `run` command
pub async fn run_host(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(max_pending) = args.max_pending {
        info!(max_pending, "Overriding max pending batches from CLI");
        blueprint.circuit.max_pending_batches = max_pending;
    }
    if args.metrics_port != 0 {
        info!(port = args.metrics_port, "Overriding metrics port from CLI");
        blueprint.metrics_port = Some(args.metrics_port);
    }

    info!(
        max_pending = blueprint.circuit.max_pending_batches,
        mailbox = blueprint.circuit.mailbox_capacity,
        grace_secs = blueprint.circuit.disconnect_grace_secs,
        sessions = args.sessions,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build host configuration
    let host_config = HostConfig {
        metrics_port: blueprint.metrics_port,
        blueprint,
        sessions: args.sessions,
        batches: if args.batches == 0 {
            None
        } else {
            Some(args.batches)
        },
        interval: Duration::from_millis(args.interval_ms),
        disconnect_at: if args.disconnect_at == 0 {
            None
        } else {
            Some(args.disconnect_at)
        },
    };

    // Create the host
    let host = DemoHost::new(host_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    // Optional wall-clock limit on the whole run
    let deadline = async {
        if args.timeout == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(args.timeout)).await
        }
    };

    info!("Starting host...");

    tokio::select! {
        result = host.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        acked = stats.delivery.batches_acked,
                        resent = stats.delivery.batches_resent,
                        duration_secs = stats.duration.as_secs_f64(),
                        throughput = format!("{:.2}", stats.throughput()),
                        "Host completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Host execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping host...");
        }
        _ = deadline => {
            warn!(timeout_secs = args.timeout, "Host timed out");
        }
    }

    info!("Circuit Stream finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::HostBlueprint) {
    let circuit = &blueprint.circuit;

    println!("\n=== Configuration Summary ===\n");
    println!("Circuit:");
    println!("  Max pending batches: {}", circuit.max_pending_batches);
    println!("  Mailbox capacity: {}", circuit.mailbox_capacity);
    println!("  Disconnect grace: {}s", circuit.disconnect_grace_secs);
    println!(
        "  Outbound queue capacity: {}",
        circuit.outbound_queue_capacity()
    );

    match blueprint.metrics_port {
        Some(port) => println!("\nMetrics port: {}", port),
        None => println!("\nMetrics: disabled"),
    }

    println!();
}
