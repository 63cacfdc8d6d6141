//! # Delivery
//!
//! Reliable batch delivery state: the bounded pending-batch queue and the
//! acknowledgement processor.
//!
//! Responsibilities:
//! - Assign gapless sequence numbers and snapshot payloads
//! - Bound unacknowledged growth (backpressure)
//! - Interpret cumulative / duplicate / out-of-range acknowledgements
//! - Keep pending batches available for oldest-first resend

pub mod ack;
pub mod queue;

pub use ack::{process_ack, AckDisposition};
pub use queue::{AckOutcome, PendingBatch, PendingBatchQueue};
