//! Side-car cache of per-segment statistics.
//!
//! Each segment's result is stored next to it as `<cache_path>.tagstats`,
//! bincode encoded together with a format version and the detection settings
//! it was computed with. Any mismatch is a miss.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{DetectionSettings, FrameSegment};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::compute::{compute_segment, TimedStatistics};
use crate::error::{Result, StatisticsError};

const CACHE_VERSION: u32 = 1;
const CACHE_EXTENSION: &str = ".tagstats";

#[derive(Serialize, Deserialize)]
struct CachedStatistics {
    version: u32,
    settings: DetectionSettings,
    statistics: TimedStatistics,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(TimedStatistics),
    /// Nothing valid cached; distinct from a cached empty result.
    NotComputed,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Per-segment statistics cache.
///
/// Concurrent requests for the same segment compute it once: the first takes
/// the segment lock, the others wait and read its result.
#[derive(Debug, Default)]
pub struct StatisticsCache {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl StatisticsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache file of a segment, if it can be cached.
    pub fn cache_file(segment: &dyn FrameSegment) -> Option<PathBuf> {
        let mut path: OsString = segment.cache_path()?.into_os_string();
        path.push(CACHE_EXTENSION);
        Some(PathBuf::from(path))
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    /// Reads the cached statistics of a segment.
    pub fn lookup(
        &self,
        segment: &dyn FrameSegment,
        settings: &DetectionSettings,
    ) -> Result<CacheLookup> {
        let Some(path) = Self::cache_file(segment) else {
            return Ok(CacheLookup::NotComputed);
        };
        read(&path, settings)
    }

    /// Cached statistics of a segment, computing and storing them on a miss.
    #[instrument(name = "statistics_segment", skip(self, segment, settings), fields(segment = segment.name()))]
    pub fn get_or_compute(
        &self,
        segment: &dyn FrameSegment,
        settings: &DetectionSettings,
    ) -> Result<TimedStatistics> {
        let Some(path) = Self::cache_file(segment) else {
            observability::record_cache_lookup(false);
            return Ok(compute_segment(segment.frames()));
        };

        let lock = self.lock_for(&path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let CacheLookup::Hit(statistics) = read(&path, settings)? {
            observability::record_cache_lookup(true);
            return Ok(statistics);
        }
        observability::record_cache_lookup(false);

        let statistics = compute_segment(segment.frames());
        write(&path, settings, &statistics)?;
        debug!(path = ?path, tags = statistics.tags.len(), "Statistics cached");
        Ok(statistics)
    }
}

fn read(path: &Path, settings: &DetectionSettings) -> Result<CacheLookup> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheLookup::NotComputed),
        Err(source) => {
            return Err(StatisticsError::CacheIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let cached: CachedStatistics = match bincode::deserialize(&bytes) {
        Ok(cached) => cached,
        Err(error) => {
            debug!(path = ?path, error = %error, "Unreadable statistics cache");
            return Ok(CacheLookup::NotComputed);
        }
    };
    if cached.version != CACHE_VERSION || cached.settings != *settings {
        debug!(
            path = ?path,
            version = cached.version,
            settings = ?cached.settings,
            "Stale statistics cache"
        );
        return Ok(CacheLookup::NotComputed);
    }
    Ok(CacheLookup::Hit(cached.statistics))
}

fn write(path: &Path, settings: &DetectionSettings, statistics: &TimedStatistics) -> Result<()> {
    let cached = CachedStatistics {
        version: CACHE_VERSION,
        settings: *settings,
        statistics: statistics.clone(),
    };
    let bytes = bincode::serialize(&cached).map_err(|source| StatisticsError::CacheEncode {
        path: path.to_path_buf(),
        source,
    })?;
    let io_error = |source| StatisticsError::CacheIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    // Readers never see a partial file.
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    fs::write(&partial, bytes).map_err(io_error)?;
    fs::rename(&partial, path).map_err(io_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FrameSource, TagFamily, TagId};
    use ingestion::{SyntheticColony, SyntheticColonyConfig};

    fn segment(dir: &Path) -> Arc<dyn FrameSegment> {
        let source = SyntheticColony::new(SyntheticColonyConfig {
            ants: 3,
            frames: 40,
            detection_rate: 0.7,
            ..Default::default()
        })
        .unwrap()
        .generate()
        .unwrap()
        .with_cache_dir(dir);
        source.segments().remove(0)
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let seg = segment(dir.path());
        let cache = StatisticsCache::new();
        let settings = DetectionSettings::default();

        assert_eq!(
            cache.lookup(seg.as_ref(), &settings).unwrap(),
            CacheLookup::NotComputed
        );
        let computed = cache.get_or_compute(seg.as_ref(), &settings).unwrap();
        assert!(computed.get(TagId(0)).is_some());
        assert!(StatisticsCache::cache_file(seg.as_ref())
            .unwrap()
            .to_string_lossy()
            .ends_with("space1-0000.frames.tagstats"));
        assert_eq!(
            cache.lookup(seg.as_ref(), &settings).unwrap(),
            CacheLookup::Hit(computed)
        );
    }

    #[test]
    fn test_settings_mismatch_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let seg = segment(dir.path());
        let cache = StatisticsCache::new();
        cache
            .get_or_compute(seg.as_ref(), &DetectionSettings::default())
            .unwrap();
        let other = DetectionSettings {
            family: TagFamily::Tag16h5,
            threshold: 40,
        };
        assert!(!cache.lookup(seg.as_ref(), &other).unwrap().is_hit());
        cache.get_or_compute(seg.as_ref(), &other).unwrap();
        assert!(cache.lookup(seg.as_ref(), &other).unwrap().is_hit());
    }

    #[test]
    fn test_corrupted_file_recomputed() {
        let dir = tempfile::tempdir().unwrap();
        let seg = segment(dir.path());
        let path = StatisticsCache::cache_file(seg.as_ref()).unwrap();
        fs::write(&path, b"not bincode").unwrap();
        let cache = StatisticsCache::new();
        let settings = DetectionSettings::default();
        assert!(!cache.lookup(seg.as_ref(), &settings).unwrap().is_hit());
        let stats = cache.get_or_compute(seg.as_ref(), &settings).unwrap();
        assert_eq!(
            cache.lookup(seg.as_ref(), &settings).unwrap(),
            CacheLookup::Hit(stats)
        );
    }

    #[test]
    fn test_empty_result_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let source = ingestion::MemoryFrameSource::from_frames(
            contracts::SpaceId(1),
            vec![contracts::RawFrame::new(
                contracts::FrameId(0),
                contracts::Time::from_unix_nanos(0),
                contracts::SpaceId(1),
            )],
        )
        .unwrap()
        .with_cache_dir(dir.path());
        let seg = source.segments().remove(0);
        let cache = StatisticsCache::new();
        let settings = DetectionSettings::default();
        let stats = cache.get_or_compute(seg.as_ref(), &settings).unwrap();
        assert!(stats.is_empty());
        assert!(cache.lookup(seg.as_ref(), &settings).unwrap().is_hit());
    }

    #[test]
    fn test_concurrent_requests_agree() {
        let dir = tempfile::tempdir().unwrap();
        let seg = segment(dir.path());
        let cache = Arc::new(StatisticsCache::new());
        let results: Vec<TimedStatistics> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let seg = Arc::clone(&seg);
                    s.spawn(move || {
                        cache
                            .get_or_compute(seg.as_ref(), &DetectionSettings::default())
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}
