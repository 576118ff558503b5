//! FrameSource trait - per-space frame reader abstraction
//!
//! The on-disk tracking format is not read here. A source only has to hand out
//! cursors of [`RawFrame`] in frame order, positioned either on a frame ID or on
//! a time, and expose the segments (files) it is made of so that per-segment
//! results can be cached.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{FrameError, FrameId, RawFrame, SpaceId, Time};

/// Item produced by a frame cursor; malformed frames surface as errors.
pub type FrameResult = Result<RawFrame, FrameError>;

/// Forward iterator over the frames of one space.
pub type FrameCursor = Box<dyn Iterator<Item = FrameResult> + Send>;

/// Tag family the detector was configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagFamily {
    #[default]
    Tag36h11,
    Tag36h10,
    Tag36ARTag,
    Tag16h5,
    Tag25h9,
    Circle21h7,
    Circle49h12,
    Custom48h12,
    Standard41h12,
    Standard52h13,
}

impl fmt::Display for TagFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TagFamily::Tag36h11 => "36h11",
            TagFamily::Tag36h10 => "36h10",
            TagFamily::Tag36ARTag => "36ARTag",
            TagFamily::Tag16h5 => "16h5",
            TagFamily::Tag25h9 => "25h9",
            TagFamily::Circle21h7 => "Circle21h7",
            TagFamily::Circle49h12 => "Circle49h12",
            TagFamily::Custom48h12 => "Custom48h12",
            TagFamily::Standard41h12 => "Standard41h12",
            TagFamily::Standard52h13 => "Standard52h13",
        };
        f.write_str(s)
    }
}

/// Detector settings a segment was produced with. Cached results are only
/// valid for identical settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectionSettings {
    pub family: TagFamily,
    pub threshold: u8,
}

/// One contiguous chunk (typically one file) of a space's frames.
pub trait FrameSegment: Send + Sync {
    /// Human readable name (used for logging)
    fn name(&self) -> &str;

    fn space(&self) -> SpaceId;

    /// Base path of side-car caches derived from this segment; each cache
    /// appends its own extension. `None` disables caching.
    fn cache_path(&self) -> Option<PathBuf>;

    /// Cursor over every frame of the segment.
    fn frames(&self) -> FrameCursor;
}

/// Frame source of one space.
pub trait FrameSource: Send + Sync {
    fn space(&self) -> SpaceId;

    fn settings(&self) -> DetectionSettings;

    /// Cursor starting at `frame` (or the next existing frame after it).
    fn seek_frame(&self, frame: FrameId) -> FrameCursor;

    /// Cursor starting at the first frame at or after `time`; `None` rewinds to
    /// the beginning. Implementations use an index, not a linear scan.
    fn seek_time(&self, time: Option<Time>) -> FrameCursor;

    /// Segments in time order.
    fn segments(&self) -> Vec<Arc<dyn FrameSegment>>;
}
