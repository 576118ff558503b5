//! Time-ordered merge of several spaces
//!
//! Each space yields frames in its own order. [`MergedFrameStream`] keeps one
//! pending frame per space in a min-heap keyed by `(time, space, frame)` and
//! always hands out the smallest, so ties between spaces resolve by space ID
//! and then by frame ID.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use contracts::{FrameCursor, FrameId, FrameSource, RawFrame, SpaceId, Time};
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

struct Pending {
    key: (Time, SpaceId, FrameId),
    cursor: usize,
    frame: RawFrame,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// k-way merge of per-space cursors restricted to `[start, end)`.
pub struct MergedFrameStream {
    cursors: Vec<FrameCursor>,
    heap: BinaryHeap<Reverse<Pending>>,
    start: Option<Time>,
    end: Option<Time>,
    metrics: Arc<IngestionMetrics>,
}

impl MergedFrameStream {
    /// Positions one cursor per source at `start`.
    ///
    /// # Errors
    /// Two sources may not serve the same space.
    #[instrument(name = "merged_stream_open", skip(sources, metrics), fields(sources = sources.len()))]
    pub fn new(
        sources: &[Arc<dyn FrameSource>],
        start: Option<Time>,
        end: Option<Time>,
        metrics: Arc<IngestionMetrics>,
    ) -> Result<Self> {
        let mut spaces: Vec<SpaceId> = sources.iter().map(|s| s.space()).collect();
        spaces.sort_unstable();
        if let Some(w) = spaces.windows(2).find(|w| w[0] == w[1]) {
            return Err(IngestionError::DuplicateSpace { space: w[0] });
        }

        let mut stream = Self {
            cursors: sources.iter().map(|s| s.seek_time(start)).collect(),
            heap: BinaryHeap::with_capacity(sources.len()),
            start,
            end,
            metrics,
        };
        for cursor in 0..stream.cursors.len() {
            stream.refill(cursor);
        }
        debug!(primed = stream.heap.len(), "Merged frame stream opened");
        Ok(stream)
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// Pulls the next well-formed frame of `cursor` into the heap.
    fn refill(&mut self, cursor: usize) {
        let Some(source) = self.cursors.get_mut(cursor) else {
            return;
        };
        for item in source.by_ref() {
            match item {
                Ok(frame) => {
                    if self.start.is_some_and(|s| frame.time.before(&s)) {
                        continue;
                    }
                    self.heap.push(Reverse(Pending {
                        key: (frame.time, frame.space, frame.frame_id),
                        cursor,
                        frame,
                    }));
                    return;
                }
                Err(error) => {
                    warn!(error = %error, "Skipping malformed frame");
                    self.metrics.record_skipped();
                    counter!("colony_frames_skipped_total").increment(1);
                }
            }
        }
    }
}

impl Iterator for MergedFrameStream {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        let Reverse(pending) = self.heap.pop()?;
        if self.end.is_some_and(|e| !pending.frame.time.before(&e)) {
            // Every other pending frame is at least as late.
            self.heap.clear();
            return None;
        }
        self.refill(pending.cursor);
        self.metrics.record_loaded();
        counter!("colony_frames_loaded_total").increment(1);
        Some(pending.frame)
    }
}
