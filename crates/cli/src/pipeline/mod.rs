//! Demo host orchestration module.

mod loopback;
mod orchestrator;
mod stats;

pub use orchestrator::{DemoHost, HostConfig};
pub use stats::HostStats;
