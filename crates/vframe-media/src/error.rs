//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or decoding a segment.
///
/// Retry disposition is tagged here, at the point of origin, and read
/// unchanged by the consumer (see [`MediaError::is_fatal`]).
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Segment fetch returned HTTP {0}")]
    UnexpectedStatus(u16),

    #[error("Segment is not a video (content type: {0})")]
    NotAVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// True when redelivery cannot change the outcome: the segment itself is
    /// malformed, not a video, or undecodable.
    ///
    /// Network failures, filesystem errors and a missing ffmpeg binary are
    /// host or transport conditions, so they stay retryable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MediaError::UnexpectedStatus(_)
                | MediaError::NotAVideo(_)
                | MediaError::FfmpegFailed { .. }
        )
    }
}
