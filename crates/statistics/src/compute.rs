//! Per-segment tag statistics and their merges.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use contracts::{Duration, FrameId, FrameResult, TagCounter, TagId, TagStatistics, Time};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{Result, StatisticsError};

/// Gap below which a re-sighting is tracking jitter.
const JITTER: Duration = Duration::from_millis(500);

const GAP_BOUNDS: [(Duration, TagCounter); 7] = [
    (Duration::from_millis(500), TagCounter::Gap500Ms),
    (Duration::SECOND, TagCounter::Gap1S),
    (Duration::from_secs(10), TagCounter::Gap10S),
    (Duration::MINUTE, TagCounter::Gap1M),
    (Duration::from_secs(600), TagCounter::Gap10M),
    (Duration::HOUR, TagCounter::Gap1H),
    (Duration::from_secs(36_000), TagCounter::Gap10H),
];

/// Bucket of a gap. Negative gaps (out of order frames) have none.
pub fn compute_gap(gap: Duration) -> Option<TagCounter> {
    if gap.is_negative() {
        return None;
    }
    let bucket = GAP_BOUNDS
        .iter()
        .find(|(bound, _)| gap < *bound)
        .map_or(TagCounter::GapMore, |(_, counter)| *counter);
    Some(bucket)
}

/// Counts the gap between two sightings. Jitter and clock changes are not
/// counted.
fn update_gaps(stats: &mut TagStatistics, previous: &Time, current: &Time) {
    let Some(gap) = current.gap_since(previous) else {
        return;
    };
    if gap < JITTER {
        return;
    }
    if let Some(bucket) = compute_gap(gap) {
        stats.increment(bucket);
    }
}

/// Merges of [`TagStatistics`].
pub trait TagStatisticsExt: Sized {
    /// Joins two consecutive windows of the same tag; the gap across the seam
    /// is counted once.
    fn merge_timed(self, newer: Self) -> Result<Self>;

    /// Joins the statistics of one tag seen in two spaces.
    fn merge_spaces(self, other: Self) -> Result<Self>;
}

impl TagStatisticsExt for TagStatistics {
    fn merge_timed(mut self, newer: TagStatistics) -> Result<TagStatistics> {
        if self.tag != newer.tag {
            return Err(StatisticsError::TagMismatch {
                left: self.tag,
                right: newer.tag,
            });
        }
        if newer.first_seen.before(&self.last_seen) {
            return Err(StatisticsError::OutOfOrder {
                tag: self.tag,
                older_last: self.last_seen,
                newer_first: newer.first_seen,
            });
        }
        for (count, other) in self.counts.iter_mut().zip(newer.counts) {
            *count += other;
        }
        let seam = self.last_seen;
        update_gaps(&mut self, &seam, &newer.first_seen);
        self.last_seen = newer.last_seen;
        Ok(self)
    }

    fn merge_spaces(mut self, other: TagStatistics) -> Result<TagStatistics> {
        if self.tag != other.tag {
            return Err(StatisticsError::TagMismatch {
                left: self.tag,
                right: other.tag,
            });
        }
        for (count, o) in self.counts.iter_mut().zip(other.counts) {
            *count += o;
        }
        if other.first_seen.before(&self.first_seen) {
            self.first_seen = other.first_seen;
        }
        if self.last_seen.before(&other.last_seen) {
            self.last_seen = other.last_seen;
        }
        Ok(self)
    }
}

/// Statistics of every tag seen in a time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedStatistics {
    /// Time of the first and last frame scanned
    pub start: Option<Time>,
    pub end: Option<Time>,
    pub tags: BTreeMap<TagId, TagStatistics>,
}

impl TimedStatistics {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, tag: TagId) -> Option<&TagStatistics> {
        self.tags.get(&tag)
    }

    /// Appends a window that follows this one.
    pub fn merge_time(mut self, newer: TimedStatistics) -> Result<TimedStatistics> {
        for (tag, stats) in newer.tags {
            let merged = match self.tags.remove(&tag) {
                Some(older) => older.merge_timed(stats)?,
                None => stats,
            };
            self.tags.insert(tag, merged);
        }
        self.start = self.start.or(newer.start);
        self.end = newer.end.or(self.end);
        Ok(self)
    }

    /// Joins the statistics of another space over the same period.
    pub fn merge_spaces(mut self, other: TimedStatistics) -> Result<TimedStatistics> {
        for (tag, stats) in other.tags {
            let merged = match self.tags.remove(&tag) {
                Some(mine) => mine.merge_spaces(stats)?,
                None => stats,
            };
            self.tags.insert(tag, merged);
        }
        self.start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(if b.before(&a) { b } else { a }),
            (a, b) => a.or(b),
        };
        self.end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(if a.before(&b) { b } else { a }),
            (a, b) => a.or(b),
        };
        Ok(self)
    }
}

/// Scans the frames of one segment once.
///
/// Malformed frames are skipped.
pub fn compute_segment<I>(frames: I) -> TimedStatistics
where
    I: IntoIterator<Item = FrameResult>,
{
    let mut result = TimedStatistics::default();
    let mut last_frame: BTreeMap<TagId, FrameId> = BTreeMap::new();
    let mut scanned = 0u64;

    for frame in frames {
        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                warn!(error = %error, "Skipping malformed frame");
                counter!("colony_frames_skipped_total").increment(1);
                continue;
            }
        };
        scanned += 1;
        result.start.get_or_insert(frame.time);
        result.end = Some(frame.time);

        for detection in &frame.tags {
            match result.tags.entry(detection.tag) {
                Entry::Vacant(slot) => {
                    slot.insert(TagStatistics::new(detection.tag, frame.time));
                }
                Entry::Occupied(mut slot) => {
                    let stats = slot.get_mut();
                    if last_frame.get(&detection.tag) == Some(&frame.frame_id) {
                        stats.increment(TagCounter::MultipleSeen);
                        continue;
                    }
                    let previous = stats.last_seen;
                    update_gaps(stats, &previous, &frame.time);
                    stats.increment(TagCounter::TotalSeen);
                    stats.last_seen = frame.time;
                }
            }
            last_frame.insert(detection.tag, frame.frame_id);
        }
    }
    trace!(frames = scanned, tags = result.tags.len(), "Segment scanned");
    result
}
