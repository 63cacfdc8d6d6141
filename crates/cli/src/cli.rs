//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Circuit Stream - server-side session and batch-delivery host
#[derive(Parser, Debug)]
#[command(
    name = "circuit-stream",
    author,
    version,
    about = "Circuit session and batch-delivery host",
    long_about = "Hosts circuit sessions: each session renders batches on its own \n\
                  logical thread, delivers them over an attached transport, and \n\
                  holds produced batches pending until the client acknowledges \n\
                  them, surviving disconnects and reconnects in between."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CIRCUIT_STREAM_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CIRCUIT_STREAM_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the demo host with loopback clients
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "CIRCUIT_STREAM_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of concurrent sessions to host
    #[arg(long, default_value = "1", env = "CIRCUIT_STREAM_SESSIONS")]
    pub sessions: usize,

    /// Batches to render per session (0 = unlimited)
    #[arg(long, default_value = "20", env = "CIRCUIT_STREAM_BATCHES")]
    pub batches: u64,

    /// Delay between render requests, in milliseconds
    #[arg(long, default_value = "50", env = "CIRCUIT_STREAM_INTERVAL_MS")]
    pub interval_ms: u64,

    /// Simulate a transport loss after this many batches (0 = never)
    #[arg(long, default_value = "0", env = "CIRCUIT_STREAM_DISCONNECT_AT")]
    pub disconnect_at: u64,

    /// Override max pending batches from configuration
    #[arg(long, env = "CIRCUIT_STREAM_MAX_PENDING")]
    pub max_pending: Option<usize>,

    /// Host timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CIRCUIT_STREAM_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = use config, which may disable it)
    #[arg(long, default_value = "0", env = "CIRCUIT_STREAM_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
