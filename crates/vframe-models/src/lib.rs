//! Shared data models for the vframe backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video and job identifiers
//! - Uploaded frames and per-segment frame maps
//! - Events published to the frame events stream

pub mod event;
pub mod frame;
pub mod ids;

// Re-export common types
pub use event::{absolute_frame_idx, FrameCreatedEvent, SegmentEvent};
pub use frame::{Frame, FrameMap};
pub use ids::{JobId, VideoId};
