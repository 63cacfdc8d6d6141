//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - Batches carry gapless sequence numbers assigned per circuit, starting at 1
//! - Acknowledgements are cumulative: acking N confirms every sequence <= N
//! - All circuit-owned mutable state is touched only on that circuit's dispatcher

mod batch;
mod command;
mod config;
mod error;
mod fault;
mod ids;
mod observer;
mod renderer;
mod state;
mod transport;

pub use batch::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use fault::*;
pub use ids::{ConnectionId, SessionId};
pub use observer::{LifecycleObserver, SessionInfo};
pub use renderer::BatchRenderer;
pub use state::SessionState;
pub use transport::Transport;
