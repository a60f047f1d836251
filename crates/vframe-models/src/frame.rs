//! Frame results produced by segment processing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One frame persisted to object storage.
///
/// `idx` is the frame's position within the decoded sequence, before
/// downsampling. A `Frame` is produced once per successful upload and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Decoded-sequence index of the retained frame
    pub idx: u32,
    /// Public object-storage address
    pub uri: String,
}

impl Frame {
    pub fn new(idx: u32, uri: impl Into<String>) -> Self {
        Self {
            idx,
            uri: uri.into(),
        }
    }
}

/// Retained-frame index -> uploaded uri for one fully processed segment.
///
/// Keyed by index so batch completion order never affects the final shape.
pub type FrameMap = BTreeMap<u32, String>;
