//! In-memory frame source
//!
//! Holds the frames of one space in frame order together with a time index,
//! and cuts them into fixed-size segments so that per-segment caching can be
//! exercised without a file format.

use std::path::PathBuf;
use std::sync::Arc;

use contracts::{
    DetectionSettings, FrameCursor, FrameError, FrameId, FrameResult, FrameSegment, FrameSource,
    RawFrame, SpaceId, Time,
};

use crate::error::{IngestionError, Result};

const DEFAULT_SEGMENT_FRAMES: usize = 1_000;

#[derive(Debug, Clone)]
struct StoredFrame {
    frame_id: FrameId,
    time: Time,
    result: FrameResult,
}

/// Cursor over a shared frame vector.
struct MemoryCursor {
    frames: Arc<Vec<StoredFrame>>,
    next: usize,
    end: usize,
}

impl Iterator for MemoryCursor {
    type Item = FrameResult;

    fn next(&mut self) -> Option<FrameResult> {
        if self.next >= self.end {
            return None;
        }
        let item = self.frames.get(self.next)?.result.clone();
        self.next += 1;
        Some(item)
    }
}

/// Contiguous range of a [`MemoryFrameSource`].
#[derive(Clone)]
pub struct MemorySegment {
    name: String,
    space: SpaceId,
    frames: Arc<Vec<StoredFrame>>,
    begin: usize,
    end: usize,
    path: Option<PathBuf>,
}

impl FrameSegment for MemorySegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn space(&self) -> SpaceId {
        self.space
    }

    fn cache_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn frames(&self) -> FrameCursor {
        Box::new(MemoryCursor {
            frames: Arc::clone(&self.frames),
            next: self.begin,
            end: self.end,
        })
    }
}

/// Frames of one space held in memory.
#[derive(Clone)]
pub struct MemoryFrameSource {
    space: SpaceId,
    settings: DetectionSettings,
    frames: Arc<Vec<StoredFrame>>,
    segment_frames: usize,
    cache_dir: Option<PathBuf>,
}

impl std::fmt::Debug for MemoryFrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFrameSource")
            .field("space", &self.space)
            .field("frames", &self.frames.len())
            .field("segment_frames", &self.segment_frames)
            .finish()
    }
}

impl MemoryFrameSource {
    pub fn new(space: SpaceId) -> Self {
        Self {
            space,
            settings: DetectionSettings::default(),
            frames: Arc::new(Vec::new()),
            segment_frames: DEFAULT_SEGMENT_FRAMES,
            cache_dir: None,
        }
    }

    /// Builds a source from frames in frame order.
    ///
    /// # Errors
    /// Frames must belong to `space`, with increasing IDs and non-decreasing
    /// times.
    pub fn from_frames(space: SpaceId, frames: Vec<RawFrame>) -> Result<Self> {
        let mut source = Self::new(space);
        for frame in frames {
            source.push(frame)?;
        }
        Ok(source)
    }

    pub fn with_settings(mut self, settings: DetectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Frames per segment (at least one).
    pub fn with_segment_frames(mut self, frames: usize) -> Self {
        self.segment_frames = frames.max(1);
        self
    }

    /// Directory in which segment side-car caches are written.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn check_order(&self, frame_id: FrameId, time: &Time) -> Result<()> {
        if let Some(last) = self.frames.last() {
            if frame_id <= last.frame_id || time.before(&last.time) {
                return Err(IngestionError::OutOfOrder {
                    space: self.space,
                    message: format!("{frame_id} at {time} after {} at {}", last.frame_id, last.time),
                });
            }
        }
        Ok(())
    }

    /// Appends a frame.
    pub fn push(&mut self, frame: RawFrame) -> Result<()> {
        if frame.space != self.space {
            return Err(IngestionError::OutOfOrder {
                space: self.space,
                message: format!("{} belongs to {}", frame.frame_id, frame.space),
            });
        }
        self.check_order(frame.frame_id, &frame.time)?;
        Arc::make_mut(&mut self.frames).push(StoredFrame {
            frame_id: frame.frame_id,
            time: frame.time,
            result: Ok(frame),
        });
        Ok(())
    }

    /// Appends a frame that fails to decode.
    pub fn push_malformed(&mut self, frame_id: FrameId, time: Time, message: &str) -> Result<()> {
        self.check_order(frame_id, &time)?;
        let error = FrameError::malformed(self.space, frame_id, message);
        Arc::make_mut(&mut self.frames).push(StoredFrame {
            frame_id,
            time,
            result: Err(error),
        });
        Ok(())
    }

    fn cursor_from(&self, index: usize) -> FrameCursor {
        Box::new(MemoryCursor {
            frames: Arc::clone(&self.frames),
            next: index,
            end: self.frames.len(),
        })
    }
}

impl FrameSource for MemoryFrameSource {
    fn space(&self) -> SpaceId {
        self.space
    }

    fn settings(&self) -> DetectionSettings {
        self.settings
    }

    fn seek_frame(&self, frame: FrameId) -> FrameCursor {
        let index = self.frames.partition_point(|f| f.frame_id < frame);
        self.cursor_from(index)
    }

    fn seek_time(&self, time: Option<Time>) -> FrameCursor {
        let index = match time {
            Some(t) => self.frames.partition_point(|f| f.time.before(&t)),
            None => 0,
        };
        self.cursor_from(index)
    }

    fn segments(&self) -> Vec<Arc<dyn FrameSegment>> {
        let total = self.frames.len();
        (0..total)
            .step_by(self.segment_frames)
            .enumerate()
            .map(|(i, begin)| {
                let name = format!("space{}-{:04}", self.space.get(), i);
                let path = self
                    .cache_dir
                    .as_ref()
                    .map(|dir| dir.join(format!("{name}.frames")));
                Arc::new(MemorySegment {
                    name,
                    space: self.space,
                    frames: Arc::clone(&self.frames),
                    begin,
                    end: (begin + self.segment_frames).min(total),
                    path,
                }) as Arc<dyn FrameSegment>
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(n: u64) -> MemoryFrameSource {
        let frames = (0..n)
            .map(|i| RawFrame::new(FrameId(i), Time::from_unix_nanos(i as i64 * 10), SpaceId(1)))
            .collect();
        MemoryFrameSource::from_frames(SpaceId(1), frames).unwrap()
    }

    fn ids(cursor: FrameCursor) -> Vec<u64> {
        cursor.map(|f| f.unwrap().frame_id.get()).collect()
    }

    #[test]
    fn test_seek_time_uses_first_frame_at_or_after() {
        let src = source(10);
        assert_eq!(ids(src.seek_time(Some(Time::from_unix_nanos(35))))[0], 4);
        assert_eq!(ids(src.seek_time(Some(Time::from_unix_nanos(40))))[0], 4);
        assert_eq!(ids(src.seek_time(None)).len(), 10);
        assert!(ids(src.seek_time(Some(Time::from_unix_nanos(1_000)))).is_empty());
    }

    #[test]
    fn test_seek_frame() {
        let src = source(10);
        assert_eq!(ids(src.seek_frame(FrameId(7))), vec![7, 8, 9]);
    }

    #[test]
    fn test_segments_cover_all_frames() {
        let src = source(25).with_segment_frames(10).with_cache_dir("/tmp/cache");
        let segments = src.segments();
        assert_eq!(segments.len(), 3);
        let total: usize = segments.iter().map(|s| s.frames().count()).sum();
        assert_eq!(total, 25);
        assert_eq!(segments[2].name(), "space1-0002");
        assert_eq!(
            segments[0].cache_path(),
            Some(PathBuf::from("/tmp/cache/space1-0000.frames"))
        );
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut src = source(3);
        let err = src.push(RawFrame::new(FrameId(1), Time::from_unix_nanos(100), SpaceId(1)));
        assert!(err.is_err());
        let err = src.push(RawFrame::new(FrameId(5), Time::from_unix_nanos(100), SpaceId(2)));
        assert!(err.is_err());
        assert_eq!(src.len(), 3);
    }

    #[test]
    fn test_malformed_frames_surface_as_errors() {
        let mut src = source(2);
        src.push_malformed(FrameId(2), Time::from_unix_nanos(20), "bad crc")
            .unwrap();
        let results: Vec<FrameResult> = src.seek_time(None).collect();
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
    }
}
