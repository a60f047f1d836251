//! Segment download and frame extraction.
//!
//! This crate provides:
//! - HTTP fetch of a video segment with response validation
//! - FFmpeg CLI invocation for decoding a segment into still frames

pub mod command;
pub mod download;
pub mod error;
pub mod extract;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use download::fetch_segment;
pub use error::{MediaError, MediaResult};
pub use extract::{extract_frames, DecodedFrame};
