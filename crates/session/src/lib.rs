//! # Session
//!
//! Circuit session lifecycle and the process-wide registry.
//!
//! Responsibilities:
//! - Drive the Initializing/Open/Connected/Disconnected/Closed state machine
//! - Invoke lifecycle observers in registration order, fault-isolated
//! - Produce batches through the renderer under backpressure deferral
//! - Resend pending batches oldest-first after a reconnect
//! - Map session ids to live sessions with disconnect grace periods

pub mod handle;
pub mod mock;
pub mod outbound;
pub mod registry;
pub mod session;

pub use handle::CircuitHandle;
pub use registry::CircuitRegistry;
pub use session::{open_circuit, SessionMsg};
