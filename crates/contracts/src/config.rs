//! Engine configuration contracts shared across crates.
//!
//! Every field has a default so that an empty document is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{DetectionSettings, Duration, InteractionType, TagFamily};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub collision: CollisionConfig,

    #[serde(default)]
    pub statistics: StatisticsConfig,

    #[serde(default)]
    pub observability: LoggingConfig,
}

/// Query pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Compute workers (0 = twice the available parallelism)
    pub workers: usize,
    /// Frames loaded but not yet delivered
    pub max_in_flight: usize,
    /// Capacity of the load -> compute channel
    pub channel_capacity: usize,
    /// Run load, compute and consume on the calling thread
    pub single_threaded: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_in_flight: 256,
            channel_capacity: 64,
            single_threaded: false,
        }
    }
}

impl PipelineConfig {
    /// Worker count with `0` resolved against the host.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(2)
    }
}

/// Trajectory / interaction segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Largest tolerated gap inside a trajectory, milliseconds
    pub max_gap_ms: u64,
    /// Replace segment samples by their mean position
    pub summarize_segments: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_gap_ms: 1_000,
            summarize_segments: false,
        }
    }
}

impl SegmentationConfig {
    pub fn max_gap(&self) -> Duration {
        Duration::from_millis(self.max_gap_ms as i64)
    }
}

/// Collision detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Body part pairs to test; empty tests every pair
    pub type_filter: Vec<InteractionType>,
    /// Resolve zones of identified frames
    pub compute_zones: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            type_filter: Vec::new(),
            compute_zones: true,
        }
    }
}

/// Tag statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Directory for side-car caches; `None` writes next to each segment
    pub cache_dir: Option<PathBuf>,
    pub family: TagFamily,
    pub threshold: u8,
}

impl StatisticsConfig {
    pub fn detection(&self) -> DetectionSettings {
        DetectionSettings {
            family: self.family,
            threshold: self.threshold,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Logging and metrics export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_format: LogFormat,
    pub log_level: String,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.segmentation.max_gap(), Duration::SECOND);
    }

    #[test]
    fn test_partial_section() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"pipeline": {"workers": 3}}"#).unwrap();
        assert_eq!(config.pipeline.workers, 3);
        assert_eq!(config.pipeline.max_in_flight, 256);
        assert_eq!(config.pipeline.effective_workers(), 3);
    }

    #[test]
    fn test_auto_workers() {
        assert!(PipelineConfig::default().effective_workers() >= 2);
    }
}
