//! S3-compatible object storage client.
//!
//! This crate provides:
//! - Client construction from environment configuration
//! - Public-read frame uploads with deterministic keys
//! - Public URI computation

pub mod client;
pub mod error;
pub mod operations;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use operations::{frame_key, segment_stem};
