//! Redis Streams segment-job queue.
//!
//! This crate provides:
//! - Segment job enqueueing and consumer-group consumption
//! - The message lease protocol: acknowledge, touch (renew), claim-pending
//!   redelivery, dead-letter records for terminal drops
//! - Frame event publication to the output stream

pub mod error;
pub mod events;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use events::FrameEventChannel;
pub use job::SegmentJob;
pub use queue::{JobQueue, QueueConfig};
