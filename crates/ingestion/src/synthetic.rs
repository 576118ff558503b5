//! Synthetic colony
//!
//! Deterministic frame generator used when no tracking data is at hand.
//! Ants circle around homes laid out on a ring; neighbouring paths cross so
//! that contacts happen. A seeded RNG drops detections to create gaps.

use std::f64::consts::TAU;

use contracts::{AntId, Duration, FrameId, MonoClockId, RawFrame, SpaceId, TagDetection, TagId, Time};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};
use crate::memory::MemoryFrameSource;

/// Synthetic colony configuration
#[derive(Debug, Clone)]
pub struct SyntheticColonyConfig {
    pub space: SpaceId,
    /// Number of ants, numbered from 1
    pub ants: u32,
    pub frames: u64,
    pub frame_rate_hz: f64,
    pub start: Time,
    /// Monotonic clock stamped on every frame
    pub clock: Option<MonoClockId>,
    pub width: u32,
    pub height: u32,
    /// Probability that a tag is detected in a frame
    pub detection_rate: f64,
    /// Every n-th frame is emitted malformed (None = never)
    pub malformed_every: Option<u64>,
    pub seed: u64,
}

impl Default for SyntheticColonyConfig {
    fn default() -> Self {
        Self {
            space: SpaceId(1),
            ants: 8,
            frames: 1_000,
            frame_rate_hz: 10.0,
            start: Time::from_unix_nanos(1_600_000_000_000_000_000),
            clock: Some(MonoClockId(1)),
            width: 2_000,
            height: 2_000,
            detection_rate: 0.95,
            malformed_every: None,
            seed: 42,
        }
    }
}

/// Generator of a deterministic [`MemoryFrameSource`].
#[derive(Debug, Clone)]
pub struct SyntheticColony {
    config: SyntheticColonyConfig,
}

/// Radius of each ant's walk, pixels.
const WALK_RADIUS: f64 = 120.0;

impl SyntheticColony {
    pub fn new(config: SyntheticColonyConfig) -> Result<Self> {
        if config.frame_rate_hz <= 0.0 || !config.frame_rate_hz.is_finite() {
            return Err(IngestionError::InvalidSynthetic {
                message: format!("frame rate {} must be positive", config.frame_rate_hz),
            });
        }
        if !(0.0..=1.0).contains(&config.detection_rate) {
            return Err(IngestionError::InvalidSynthetic {
                message: format!("detection rate {} outside [0, 1]", config.detection_rate),
            });
        }
        if !config.space.is_valid() {
            return Err(IngestionError::InvalidSynthetic {
                message: "space 0 is reserved".to_string(),
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SyntheticColonyConfig {
        &self.config
    }

    /// Ant and the tag it wears for the whole experiment.
    pub fn ants(&self) -> Vec<(AntId, TagId)> {
        (1..=self.config.ants)
            .map(|i| (AntId(i), TagId(i - 1)))
            .collect()
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.frame_rate_hz)
    }

    /// Tag pose of ant `index` (0-based) at `seconds`.
    fn pose(&self, index: u32, seconds: f64) -> (f64, f64, f64) {
        let n = self.config.ants.max(1) as f64;
        let cx = self.config.width as f64 / 2.0;
        let cy = self.config.height as f64 / 2.0;
        // Homes on a ring whose chord between neighbours is below two walk
        // radii, so neighbouring walks intersect.
        let ring = (1.6 * WALK_RADIUS / (2.0 * (std::f64::consts::PI / n).sin().max(1e-3)))
            .min(cx.min(cy) - WALK_RADIUS);
        let home = TAU * index as f64 / n;
        let (hx, hy) = (cx + ring * home.cos(), cy + ring * home.sin());
        let speed = 0.4 + 0.05 * (index % 5) as f64;
        let phase = home + speed * seconds;
        let x = hx + WALK_RADIUS * phase.cos();
        let y = hy + WALK_RADIUS * phase.sin();
        // Heading along the tangent of the walk.
        let angle = (phase + std::f64::consts::FRAC_PI_2).rem_euclid(TAU);
        (x, y, angle)
    }

    /// Generates every frame.
    #[instrument(name = "synthetic_colony_generate", skip(self), fields(ants = self.config.ants, frames = self.config.frames))]
    pub fn generate(&self) -> Result<MemoryFrameSource> {
        let c = &self.config;
        let mut rng = StdRng::seed_from_u64(c.seed);
        let period = self.frame_period();
        let mut source = MemoryFrameSource::new(c.space);

        for i in 0..c.frames {
            let offset = period.mul(i as i64);
            let mut time = c.start.add(offset);
            if let Some(clock) = c.clock {
                time = time.with_mono(clock, offset.as_nanos().max(0) as u64);
            }
            let frame_id = FrameId(i);
            if c.malformed_every.is_some_and(|n| n > 0 && i % n == n - 1) {
                source
                    .push_malformed(frame_id, time, "synthetic corruption")
                    .map_err(|e| IngestionError::InvalidSynthetic {
                        message: e.to_string(),
                    })?;
                continue;
            }

            let seconds = offset.as_secs_f64();
            let mut frame = RawFrame::new(frame_id, time, c.space);
            frame.width = c.width;
            frame.height = c.height;
            for (index, (_, tag)) in self.ants().into_iter().enumerate() {
                if rng.random::<f64>() >= c.detection_rate {
                    continue;
                }
                let (x, y, angle) = self.pose(index as u32, seconds);
                frame.tags.push(TagDetection {
                    tag,
                    x: x + rng.random_range(-0.5..0.5),
                    y: y + rng.random_range(-0.5..0.5),
                    angle,
                });
            }
            source.push(frame)?;
        }
        debug!(frames = source.len(), "Synthetic colony generated");
        Ok(source)
    }
}
