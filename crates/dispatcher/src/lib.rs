//! # Dispatcher
//!
//! Single-logical-thread execution engine, one per circuit session.
//!
//! Responsibilities:
//! - Serialize all session-state mutation onto one worker task
//! - Deliver completion signals for scheduled work
//! - Funnel fire-and-forget failures to the session fault channel
//! - Enforce logical-thread affinity for components that require it

pub mod affinity;
pub mod dispatcher;
pub mod handle;
pub mod metrics;

pub use affinity::{assert_on_logical_thread, on_logical_thread};
pub use dispatcher::{spawn, Actor, Flow};
pub use handle::{Completion, DispatcherHandle};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
