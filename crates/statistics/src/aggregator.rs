//! Parallel statistics over every segment of every space.

use std::sync::Arc;

use contracts::{FrameSource, TagStatistics};
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::cache::{CacheLookup, StatisticsCache};
use crate::compute::TimedStatistics;
use crate::error::Result;

/// Computes tag statistics of several spaces.
///
/// Segments of a space are computed in parallel and merged in time order;
/// spaces are then merged together.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    cache: StatisticsCache,
}

impl StatisticsAggregator {
    pub fn new(cache: StatisticsCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &StatisticsCache {
        &self.cache
    }

    /// Statistics of one space.
    pub fn compute_space(&self, source: &dyn FrameSource) -> Result<TimedStatistics> {
        let settings = source.settings();
        source
            .segments()
            .par_iter()
            .map(|segment| self.cache.get_or_compute(segment.as_ref(), &settings))
            .try_reduce(TimedStatistics::default, TimedStatistics::merge_time)
    }

    /// Statistics of every space, computing missing segments.
    #[instrument(name = "statistics_compute", skip(self, sources), fields(spaces = sources.len()))]
    pub fn compute(&self, sources: &[Arc<dyn FrameSource>]) -> Result<TimedStatistics> {
        let merged = sources
            .par_iter()
            .map(|source| self.compute_space(source.as_ref()))
            .try_reduce(TimedStatistics::default, TimedStatistics::merge_spaces)?;
        info!(tags = merged.tags.len(), "Tag statistics computed");
        Ok(merged)
    }

    /// Statistics of every space from the cache only.
    ///
    /// [`CacheLookup::NotComputed`] as soon as one segment is missing.
    pub fn cached(&self, sources: &[Arc<dyn FrameSource>]) -> Result<CacheLookup> {
        let mut merged = TimedStatistics::default();
        for source in sources {
            let settings = source.settings();
            let mut space = TimedStatistics::default();
            for segment in source.segments() {
                match self.cache.lookup(segment.as_ref(), &settings)? {
                    CacheLookup::Hit(statistics) => space = space.merge_time(statistics)?,
                    CacheLookup::NotComputed => return Ok(CacheLookup::NotComputed),
                }
            }
            merged = merged.merge_spaces(space)?;
        }
        Ok(CacheLookup::Hit(merged))
    }
}

/// Flattens merged statistics in tag order.
pub fn into_tag_list(statistics: TimedStatistics) -> Vec<TagStatistics> {
    statistics.tags.into_values().collect()
}
