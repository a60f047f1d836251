//! Segment processing worker.
//!
//! This crate provides:
//! - Batched parallel upload scheduling
//! - The frame pipeline (download, decode, downsample, upload)
//! - Lease-aware queue consumption with fatal/transient acknowledgment
//! - Frame event publication

pub mod batch;
pub mod config;
pub mod error;
pub mod executor;
pub mod lease;
pub mod logging;
pub mod pipeline;
pub mod publisher;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{ErrorClass, WorkerError, WorkerResult};
pub use executor::{JobExecutor, ProcessingContext, SegmentOutcome};
pub use lease::{LeaseKeeper, LeaseRenewer};
pub use logging::JobLogger;
pub use pipeline::{FramePipeline, PipelineEvent};
pub use publisher::EventPublisher;
