//! Frame event publication.

use std::sync::Arc;

use tracing::warn;

use vframe_models::{Frame, SegmentEvent};
use vframe_queue::{FrameEventChannel, SegmentJob};

/// Publishes frame lifecycle events to the output stream.
///
/// Publish failures are logged and swallowed: a frame that is already
/// durably stored must not fail the segment because its notification
/// did. The missing event is recoverable downstream; the upload is not
/// worth repeating.
pub struct EventPublisher {
    channel: Arc<FrameEventChannel>,
}

impl EventPublisher {
    pub fn new(channel: Arc<FrameEventChannel>) -> Self {
        Self { channel }
    }

    /// Announce one uploaded frame at its absolute index.
    pub async fn frame_created(&self, job: &SegmentJob, frame: &Frame) {
        let event = SegmentEvent::frame_created(
            job.video_id.clone(),
            job.segment_idx,
            job.fps,
            job.frames_per_segment,
            frame,
        );
        if let Err(e) = self.channel.publish(&event).await {
            warn!(
                job_id = %job.job_id,
                frame_idx = frame.idx,
                "Failed to publish frame event: {}", e
            );
        }
    }

    /// Announce segment completion.
    pub async fn segment_done(&self, job: &SegmentJob, frame_count: u32) {
        let event = SegmentEvent::segment_done(job.video_id.clone(), job.segment_idx, frame_count);
        if let Err(e) = self.channel.publish(&event).await {
            warn!(job_id = %job.job_id, "Failed to publish done event: {}", e);
        }
    }

    /// Announce a terminal drop.
    pub async fn segment_failed(&self, job: &SegmentJob, error: &str) {
        let event = SegmentEvent::segment_failed(job.video_id.clone(), job.segment_idx, error);
        if let Err(e) = self.channel.publish(&event).await {
            warn!(job_id = %job.job_id, "Failed to publish failure event: {}", e);
        }
    }
}
