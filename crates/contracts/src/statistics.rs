//! Per-tag detection statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{TagId, Time};

/// Counter slots of [`TagStatistics`].
///
/// The gap variants bucket the time a tag went unseen; a bucket covers
/// `[previous bound, bound)`, so a gap of exactly 500ms lands in `Gap1S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TagCounter {
    TotalSeen,
    MultipleSeen,
    Gap500Ms,
    Gap1S,
    Gap10S,
    Gap1M,
    Gap10M,
    Gap1H,
    Gap10H,
    GapMore,
}

impl TagCounter {
    pub const COUNT: usize = 10;

    pub const ALL: [TagCounter; Self::COUNT] = [
        TagCounter::TotalSeen,
        TagCounter::MultipleSeen,
        TagCounter::Gap500Ms,
        TagCounter::Gap1S,
        TagCounter::Gap10S,
        TagCounter::Gap1M,
        TagCounter::Gap10M,
        TagCounter::Gap1H,
        TagCounter::Gap10H,
        TagCounter::GapMore,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_gap(self) -> bool {
        !matches!(self, TagCounter::TotalSeen | TagCounter::MultipleSeen)
    }

    pub const fn label(self) -> &'static str {
        match self {
            TagCounter::TotalSeen => "total_seen",
            TagCounter::MultipleSeen => "multiple_seen",
            TagCounter::Gap500Ms => "gap_<500ms",
            TagCounter::Gap1S => "gap_<1s",
            TagCounter::Gap10S => "gap_<10s",
            TagCounter::Gap1M => "gap_<1m",
            TagCounter::Gap10M => "gap_<10m",
            TagCounter::Gap1H => "gap_<1h",
            TagCounter::Gap10H => "gap_<10h",
            TagCounter::GapMore => "gap_>=10h",
        }
    }
}

impl fmt::Display for TagCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detection statistics of one tag over a time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStatistics {
    pub tag: TagId,
    pub first_seen: Time,
    pub last_seen: Time,
    pub counts: [u64; TagCounter::COUNT],
}

impl TagStatistics {
    /// Statistics of a tag seen once at `time`.
    pub fn new(tag: TagId, time: Time) -> Self {
        let mut counts = [0; TagCounter::COUNT];
        counts[TagCounter::TotalSeen.index()] = 1;
        Self {
            tag,
            first_seen: time,
            last_seen: time,
            counts,
        }
    }

    #[inline]
    pub fn count(&self, counter: TagCounter) -> u64 {
        self.counts[counter.index()]
    }

    #[inline]
    pub fn increment(&mut self, counter: TagCounter) {
        self.counts[counter.index()] += 1;
    }

    /// Sum of every gap bucket.
    pub fn total_gaps(&self) -> u64 {
        TagCounter::ALL
            .iter()
            .filter(|c| c.is_gap())
            .map(|c| self.count(*c))
            .sum()
    }
}
