//! Events published to the frame events stream.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::ids::VideoId;

/// Absolute position of a frame within the whole video.
pub fn absolute_frame_idx(segment_idx: u32, frames_per_segment: u32, local_idx: u32) -> u64 {
    segment_idx as u64 * frames_per_segment as u64 + local_idx as u64
}

/// Notification that one frame was uploaded and is publicly addressable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCreatedEvent {
    pub video_id: VideoId,
    pub segment_idx: u32,
    pub fps: f64,
    pub frames_per_segment: u32,
    /// Absolute frame index: `segment_idx * frames_per_segment + local idx`
    pub frame_idx: u64,
    pub uri: String,
}

impl FrameCreatedEvent {
    pub fn new(
        video_id: VideoId,
        segment_idx: u32,
        fps: f64,
        frames_per_segment: u32,
        frame: &Frame,
    ) -> Self {
        Self {
            video_id,
            segment_idx,
            fps,
            frames_per_segment,
            frame_idx: absolute_frame_idx(segment_idx, frames_per_segment, frame.idx),
            uri: frame.uri.clone(),
        }
    }
}

/// Wire messages on the frame events stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentEvent {
    /// One frame uploaded
    FrameCreated(FrameCreatedEvent),
    /// All frames for the segment uploaded
    SegmentDone {
        video_id: VideoId,
        segment_idx: u32,
        frame_count: u32,
    },
    /// The segment was dropped after a terminal failure
    SegmentFailed {
        video_id: VideoId,
        segment_idx: u32,
        error: String,
    },
}

impl SegmentEvent {
    pub fn frame_created(
        video_id: VideoId,
        segment_idx: u32,
        fps: f64,
        frames_per_segment: u32,
        frame: &Frame,
    ) -> Self {
        Self::FrameCreated(FrameCreatedEvent::new(
            video_id,
            segment_idx,
            fps,
            frames_per_segment,
            frame,
        ))
    }

    pub fn segment_done(video_id: VideoId, segment_idx: u32, frame_count: u32) -> Self {
        Self::SegmentDone {
            video_id,
            segment_idx,
            frame_count,
        }
    }

    pub fn segment_failed(video_id: VideoId, segment_idx: u32, error: impl Into<String>) -> Self {
        Self::SegmentFailed {
            video_id,
            segment_idx,
            error: error.into(),
        }
    }
}
