//! Segment job type carried on the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vframe_models::{JobId, VideoId};

/// One video segment to turn into frames.
///
/// This struct is the JSON message body on the segment stream. It is
/// immutable once received; exactly one in-flight processing attempt owns it
/// at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentJob {
    /// Unique job ID
    pub job_id: JobId,
    /// Video the segment belongs to
    pub video_id: VideoId,
    /// Position of this segment within the video
    pub segment_idx: u32,
    /// Source address of the segment
    pub uri: String,
    /// Native frame rate of the segment
    pub fps: f64,
    /// Nominal decoded frames per segment, used for absolute frame indexing
    pub frames_per_segment: u32,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl SegmentJob {
    /// Create a new segment job.
    pub fn new(
        video_id: VideoId,
        segment_idx: u32,
        uri: impl Into<String>,
        fps: f64,
        frames_per_segment: u32,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            segment_idx,
            uri: uri.into(),
            fps,
            frames_per_segment,
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("segment:{}:{}", self.video_id, self.segment_idx)
    }
}
