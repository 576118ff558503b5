//! Segmenter outputs: trajectories and interactions.

use serde::{Deserialize, Serialize};

use crate::{AntId, Duration, InteractionType, SpaceId, Time, ZoneId};

/// One trajectory sample, time relative to the trajectory start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Seconds since [`AntTrajectory::start`].
    pub offset: f64,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub zone: ZoneId,
}

/// Continuous sequence of positions of one ant in one space.
///
/// Offsets are strictly increasing and no two consecutive samples are further
/// apart than the segmenter's maximum gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntTrajectory {
    pub ant: AntId,
    pub space: SpaceId,
    pub start: Time,
    pub samples: Vec<TrajectorySample>,
}

impl AntTrajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time span from the first to the last sample.
    pub fn duration(&self) -> Duration {
        self.samples
            .last()
            .map_or(Duration::ZERO, |s| Duration::from_secs_f64(s.offset))
    }

    pub fn end(&self) -> Time {
        self.start.add(self.duration())
    }

    /// Owned copy of the samples `[begin, end)` as a segment.
    pub fn segment(&self, begin: usize, end: usize) -> AntTrajectorySegment {
        let end = end.min(self.samples.len());
        let begin = begin.min(end);
        AntTrajectorySegment {
            ant: self.ant,
            begin,
            end,
            positions: SegmentPositions::Full {
                space: self.space,
                trajectory_start: self.start,
                samples: self.samples[begin..end].to_vec(),
            },
        }
    }
}

/// Circular-mean position over a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanPosition {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl MeanPosition {
    pub fn of(samples: &[TrajectorySample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let (mut x, mut y, mut sin, mut cos) = (0.0, 0.0, 0.0, 0.0);
        for s in samples {
            x += s.x;
            y += s.y;
            sin += s.angle.sin();
            cos += s.angle.cos();
        }
        Some(Self {
            x: x / n,
            y: y / n,
            angle: sin.atan2(cos),
        })
    }
}

/// Positions carried by a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentPositions {
    /// Copied samples plus the key `(space, start)` of the owning trajectory.
    Full {
        space: SpaceId,
        trajectory_start: Time,
        samples: Vec<TrajectorySample>,
    },
    /// Mean position only; the trajectory reference is dropped.
    Summarized(MeanPosition),
}

/// Sub-range `[begin, end)` of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntTrajectorySegment {
    pub ant: AntId,
    pub begin: usize,
    pub end: usize,
    pub positions: SegmentPositions,
}

impl AntTrajectorySegment {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn is_summarized(&self) -> bool {
        matches!(self.positions, SegmentPositions::Summarized(_))
    }

    pub fn samples(&self) -> Option<&[TrajectorySample]> {
        match &self.positions {
            SegmentPositions::Full { samples, .. } => Some(samples),
            SegmentPositions::Summarized(_) => None,
        }
    }

    /// Replaces the samples by their mean. Idempotent.
    pub fn summarize(&mut self) {
        if let SegmentPositions::Full { samples, .. } = &self.positions {
            if let Some(mean) = MeanPosition::of(samples) {
                self.positions = SegmentPositions::Summarized(mean);
            }
        }
    }
}

/// Continuous contact between two ants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntInteraction {
    /// Canonical order, `ants.0 < ants.1`.
    pub ants: (AntId, AntId),
    /// Union of the body part pairs seen over the interaction, sorted.
    pub types: Vec<InteractionType>,
    pub segments: (AntTrajectorySegment, AntTrajectorySegment),
    pub space: SpaceId,
    pub start: Time,
    pub end: Time,
}

impl AntInteraction {
    pub fn duration(&self) -> Duration {
        self.end.sub(&self.start)
    }

    pub fn summarize(&mut self) {
        self.segments.0.summarize();
        self.segments.1.summarize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trajectory() -> AntTrajectory {
        AntTrajectory {
            ant: AntId(1),
            space: SpaceId(1),
            start: Time::from_unix_nanos(0),
            samples: (0..4)
                .map(|i| TrajectorySample {
                    offset: i as f64 * 0.1,
                    x: i as f64,
                    y: 2.0,
                    angle: 0.0,
                    zone: ZoneId::NONE,
                })
                .collect(),
        }
    }

    #[test]
    fn test_segment_copies_slice() {
        let traj = trajectory();
        let seg = traj.segment(1, 3);
        assert_eq!(seg.len(), 2);
        let samples = seg.samples().unwrap();
        assert_eq!(samples[0].x, 1.0);
        assert_eq!(samples[1].x, 2.0);
    }

    #[test]
    fn test_summarize_mean() {
        let mut seg = trajectory().segment(0, 4);
        seg.summarize();
        assert!(seg.is_summarized());
        match seg.positions {
            SegmentPositions::Summarized(m) => {
                assert!((m.x - 1.5).abs() < 1e-12);
                assert!((m.y - 2.0).abs() < 1e-12);
            }
            SegmentPositions::Full { .. } => panic!("expected summary"),
        }
    }

    #[test]
    fn test_circular_mean_wraps() {
        let samples: Vec<_> = [std::f64::consts::PI - 0.1, -std::f64::consts::PI + 0.1]
            .iter()
            .map(|&angle| TrajectorySample {
                offset: 0.0,
                x: 0.0,
                y: 0.0,
                angle,
                zone: ZoneId::NONE,
            })
            .collect();
        let mean = MeanPosition::of(&samples).unwrap();
        assert!((mean.angle.abs() - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_duration() {
        let traj = trajectory();
        assert_eq!(traj.duration(), Duration::from_millis(300));
        assert_eq!(traj.end(), Time::from_unix_nanos(300_000_000));
    }
}
