//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    circuit: CircuitInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct CircuitInfo {
    max_pending_batches: usize,
    mailbox_capacity: usize,
    disconnect_grace_secs: u64,
    outbound_queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::HostBlueprint) -> ConfigInfo {
    let circuit = &blueprint.circuit;
    ConfigInfo {
        circuit: CircuitInfo {
            max_pending_batches: circuit.max_pending_batches,
            mailbox_capacity: circuit.mailbox_capacity,
            disconnect_grace_secs: circuit.disconnect_grace_secs,
            outbound_queue_capacity: circuit.outbound_queue_capacity(),
        },
        metrics_port: blueprint.metrics_port,
    }
}

fn print_config_info(blueprint: &contracts::HostBlueprint) {
    let circuit = &blueprint.circuit;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Circuit Stream Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Circuit");
    println!("   ├─ Max pending batches: {}", circuit.max_pending_batches);
    println!("   ├─ Mailbox capacity: {}", circuit.mailbox_capacity);
    println!(
        "   ├─ Disconnect grace: {}s",
        circuit.disconnect_grace_secs
    );
    println!(
        "   └─ Outbound queue capacity: {}",
        circuit.outbound_queue_capacity()
    );

    println!("\n📊 Observability");
    match blueprint.metrics_port {
        Some(port) => println!("   └─ Metrics port: {}", port),
        None => println!("   └─ Metrics: disabled"),
    }

    println!();
}
