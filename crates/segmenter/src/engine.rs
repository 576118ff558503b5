//! Main segmenter implementation.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{
    AntId, AntInteraction, AntTrajectory, Collision, CollisionFrame, Duration, IdentifiedFrame,
    PositionedAnt, SegmentationConfig, Time,
};
use slab::Slab;
use tracing::{debug, instrument, trace};

use crate::building::{BuildingInteraction, BuildingTrajectory};

/// Segmenter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    /// Largest tolerated gap between two samples of a trajectory, and between
    /// two contacts of an interaction
    pub max_gap: Duration,
    /// Replace interaction segment samples by their mean position
    pub summarize: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self::from(&SegmentationConfig::default())
    }
}

impl From<&SegmentationConfig> for SegmenterConfig {
    fn from(config: &SegmentationConfig) -> Self {
        Self {
            max_gap: config.max_gap(),
            summarize: config.summarize_segments,
        }
    }
}

/// Results closed by one push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentedOutput {
    pub trajectories: Vec<AntTrajectory>,
    pub interactions: Vec<AntInteraction>,
}

impl SegmentedOutput {
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty() && self.interactions.is_empty()
    }

    pub fn extend(&mut self, other: SegmentedOutput) {
        self.trajectories.extend(other.trajectories);
        self.interactions.extend(other.interactions);
    }
}

/// Turns a time-ordered stream of frames into trajectories and interactions.
///
/// Frames must be pushed in load order. Output only depends on the pushed
/// frames: replaying the same stream gives the same output.
#[derive(Debug)]
pub struct Segmenter {
    config: SegmenterConfig,
    /// Open trajectories
    trajectories: Slab<BuildingTrajectory>,
    /// Open trajectory of each ant
    by_ant: BTreeMap<AntId, usize>,
    /// Open interactions by canonical pair
    interactions: BTreeMap<(AntId, AntId), BuildingInteraction>,
    /// Frames pushed
    frame_counter: u64,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            trajectories: Slab::new(),
            by_ant: BTreeMap::new(),
            interactions: BTreeMap::new(),
            frame_counter: 0,
        }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn open_trajectories(&self) -> usize {
        self.by_ant.len()
    }

    pub fn open_interactions(&self) -> usize {
        self.interactions.len()
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frame_counter
    }

    /// Push one identified frame, with its collisions when interactions are
    /// wanted.
    ///
    /// Returns everything closed by this frame.
    #[instrument(
        level = "trace",
        name = "segmenter_push",
        skip(self, frame, collisions),
        fields(space = %frame.space, frame = %frame.frame_id)
    )]
    pub fn push(
        &mut self,
        frame: &IdentifiedFrame,
        collisions: Option<&CollisionFrame>,
    ) -> SegmentedOutput {
        self.frame_counter += 1;
        let mut out = SegmentedOutput::default();

        let mut positions: Vec<&PositionedAnt> = frame.positions.iter().collect();
        positions.sort_by_key(|p| p.ant);
        for position in positions {
            self.push_position(frame, position, &mut out);
        }

        if let Some(collisions) = collisions {
            for collision in &collisions.collisions {
                self.push_collision(frame, collision, &mut out);
            }
        }

        self.close_stale(&frame.time, &mut out);
        self.record_output(&out);
        out
    }

    /// Closes everything still open.
    #[instrument(name = "segmenter_flush", skip(self))]
    pub fn flush(&mut self) -> SegmentedOutput {
        let mut out = SegmentedOutput::default();
        let pairs: Vec<_> = self.interactions.keys().copied().collect();
        for pair in pairs {
            self.close_interaction(pair, &mut out);
        }
        let keys: Vec<_> = self.by_ant.values().copied().collect();
        for key in keys {
            self.close_trajectory(key, &mut out);
        }
        debug!(
            trajectories = out.trajectories.len(),
            interactions = out.interactions.len(),
            frames = self.frame_counter,
            "Segmenter flushed"
        );
        self.record_output(&out);
        out
    }

    fn push_position(&mut self, frame: &IdentifiedFrame, position: &PositionedAnt, out: &mut SegmentedOutput) {
        let current = self.by_ant.get(&position.ant).copied();
        if let Some(key) = current {
            let continues = self
                .trajectories
                .get(key)
                .is_some_and(|t| t.continues(frame.space, &frame.time, self.config.max_gap));
            if continues {
                if let Some(t) = self.trajectories.get_mut(key) {
                    t.append(frame.time, position);
                }
                return;
            }
            trace!(ant = %position.ant, "Trajectory discontinuity");
            self.close_trajectory(key, out);
        }
        let key = self
            .trajectories
            .insert(BuildingTrajectory::open(frame.space, frame.time, position));
        self.by_ant.insert(position.ant, key);
    }

    fn push_collision(&mut self, frame: &IdentifiedFrame, collision: &Collision, out: &mut SegmentedOutput) {
        let (a, b) = collision.ants;
        let (Some(&ka), Some(&kb)) = (self.by_ant.get(&a), self.by_ant.get(&b)) else {
            return;
        };
        let sampled_now = |key: usize| {
            self.trajectories
                .get(key)
                .filter(|t| t.last == frame.time && t.trajectory.space == frame.space)
                .map(BuildingTrajectory::current_index)
        };
        let (Some(ia), Some(ib)) = (sampled_now(ka), sampled_now(kb)) else {
            return;
        };

        let max_gap = self.config.max_gap;
        let extends = self.interactions.get(&collision.ants).map(|i| {
            i.keys == (ka, kb)
                && frame
                    .time
                    .gap_since(&i.last)
                    .is_some_and(|gap| gap > Duration::ZERO && gap <= max_gap)
        });
        match extends {
            Some(true) => {
                if let Some(i) = self.interactions.get_mut(&collision.ants) {
                    i.end = (ia + 1, ib + 1);
                    i.types.extend(collision.types.iter().copied());
                    i.last = frame.time;
                }
                return;
            }
            Some(false) => self.close_interaction(collision.ants, out),
            None => {}
        }

        for key in [ka, kb] {
            if let Some(t) = self.trajectories.get_mut(key) {
                t.force_keep = true;
            }
        }
        self.interactions.insert(
            collision.ants,
            BuildingInteraction {
                ants: collision.ants,
                keys: (ka, kb),
                types: collision.types.iter().copied().collect::<BTreeSet<_>>(),
                begin: (ia, ib),
                end: (ia, ib),
                start: frame.time,
                last: frame.time,
            },
        );
    }

    fn close_stale(&mut self, now: &Time, out: &mut SegmentedOutput) {
        let max_gap = self.config.max_gap;
        let stale_pairs: Vec<_> = self
            .interactions
            .iter()
            .filter(|(_, i)| now.sub(&i.last) > max_gap)
            .map(|(pair, _)| *pair)
            .collect();
        for pair in stale_pairs {
            self.close_interaction(pair, out);
        }

        let stale: Vec<_> = self
            .by_ant
            .values()
            .copied()
            .filter(|key| {
                self.trajectories
                    .get(*key)
                    .is_some_and(|t| t.is_stale(now, max_gap))
            })
            .collect();
        for key in stale {
            self.close_trajectory(key, out);
        }
    }

    fn close_interaction(&mut self, pair: (AntId, AntId), out: &mut SegmentedOutput) {
        let Some(interaction) = self.interactions.remove(&pair) else {
            return;
        };
        if interaction.is_single_instant() {
            trace!(ants = ?pair, "Discarding single instant interaction");
            return;
        }
        let (Some(first), Some(second)) = (
            self.trajectories.get(interaction.keys.0),
            self.trajectories.get(interaction.keys.1),
        ) else {
            return;
        };
        out.interactions.push(interaction.finish(
            &first.trajectory,
            &second.trajectory,
            self.config.summarize,
        ));
    }

    /// Closes the interactions anchored to `key`, then the trajectory.
    fn close_trajectory(&mut self, key: usize, out: &mut SegmentedOutput) {
        let anchored: Vec<_> = self
            .interactions
            .iter()
            .filter(|(_, i)| i.keys.0 == key || i.keys.1 == key)
            .map(|(pair, _)| *pair)
            .collect();
        for pair in anchored {
            self.close_interaction(pair, out);
        }

        let Some(building) = self.trajectories.try_remove(key) else {
            return;
        };
        let ant = building.trajectory.ant;
        if self.by_ant.get(&ant) == Some(&key) {
            self.by_ant.remove(&ant);
        }
        if building.is_worth_keeping() {
            out.trajectories.push(building.trajectory);
        }
    }

    fn record_output(&self, out: &SegmentedOutput) {
        if out.is_empty() {
            return;
        }
        observability::record_trajectories_emitted(out.trajectories.len());
        observability::record_interactions_emitted(out.interactions.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FrameId, MonoClockId, SpaceId, ZoneId};

    const MS: i64 = 1_000_000;

    fn config(max_gap_ms: i64) -> SegmenterConfig {
        SegmenterConfig {
            max_gap: Duration::from_millis(max_gap_ms),
            summarize: false,
        }
    }

    fn frame(i: u64, ms: i64, ants: &[u32]) -> IdentifiedFrame {
        IdentifiedFrame {
            frame_id: FrameId(i),
            time: Time::from_unix_nanos(ms * MS),
            space: SpaceId(1),
            width: 0,
            height: 0,
            positions: ants
                .iter()
                .map(|&a| PositionedAnt {
                    ant: AntId(a),
                    x: i as f64,
                    y: a as f64,
                    angle: 0.0,
                    zone: ZoneId::NONE,
                })
                .collect(),
        }
    }

    fn contact(f: &IdentifiedFrame, a: u32, b: u32) -> CollisionFrame {
        CollisionFrame {
            frame_id: f.frame_id,
            time: f.time,
            space: f.space,
            collisions: vec![Collision::new(AntId(a), AntId(b), vec![(1, 1)], ZoneId::NONE)],
        }
    }

    #[test]
    fn test_continuous_trajectory() {
        let mut seg = Segmenter::new(config(150));
        for i in 0..10 {
            assert!(seg.push(&frame(i, i as i64 * 100, &[1]), None).is_empty());
        }
        let out = seg.flush();
        assert_eq!(out.trajectories.len(), 1);
        let t = &out.trajectories[0];
        assert_eq!(t.samples.len(), 10);
        assert!(t.samples.windows(2).all(|w| w[0].offset < w[1].offset));
        assert!((t.samples[9].offset - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_gap_splits_trajectory() {
        let mut seg = Segmenter::new(config(150));
        let mut out = SegmentedOutput::default();
        for (i, ms) in [0, 100, 200, 500, 600].iter().enumerate() {
            out.extend(seg.push(&frame(i as u64, *ms, &[1]), None));
        }
        out.extend(seg.flush());
        let lens: Vec<usize> = out.trajectories.iter().map(|t| t.samples.len()).collect();
        assert_eq!(lens, vec![3, 2]);
    }

    #[test]
    fn test_stale_trajectory_closed_by_other_frames() {
        let mut seg = Segmenter::new(config(150));
        seg.push(&frame(0, 0, &[1, 2]), None);
        seg.push(&frame(1, 100, &[1, 2]), None);
        seg.push(&frame(2, 200, &[2]), None);
        let out = seg.push(&frame(3, 300, &[2]), None);
        assert_eq!(out.trajectories.len(), 1);
        assert_eq!(out.trajectories[0].ant, AntId(1));
        assert_eq!(seg.open_trajectories(), 1);
    }

    #[test]
    fn test_single_sample_trajectory_dropped() {
        let mut seg = Segmenter::new(config(150));
        seg.push(&frame(0, 0, &[1]), None);
        assert!(seg.flush().trajectories.is_empty());
    }

    #[test]
    fn test_clock_discontinuity_splits() {
        let mut seg = Segmenter::new(config(1_000));
        let mut f0 = frame(0, 0, &[1]);
        f0.time = f0.time.with_mono(MonoClockId(1), 0);
        let mut f1 = frame(1, 100, &[1]);
        f1.time = f1.time.with_mono(MonoClockId(1), 100 * MS as u64);
        let mut f2 = frame(2, 200, &[1]);
        f2.time = f2.time.with_mono(MonoClockId(2), 0);
        let mut f3 = frame(3, 300, &[1]);
        f3.time = f3.time.with_mono(MonoClockId(2), 100 * MS as u64);
        let mut out = SegmentedOutput::default();
        for f in [f0, f1, f2, f3] {
            out.extend(seg.push(&f, None));
        }
        out.extend(seg.flush());
        assert_eq!(out.trajectories.len(), 2);
    }

    #[test]
    fn test_space_change_splits() {
        let mut seg = Segmenter::new(config(1_000));
        let mut out = seg.push(&frame(0, 0, &[1]), None);
        out.extend(seg.push(&frame(1, 100, &[1]), None));
        let mut other = frame(2, 200, &[1]);
        other.space = SpaceId(2);
        out.extend(seg.push(&other, None));
        assert_eq!(out.trajectories.len(), 1);
        assert_eq!(out.trajectories[0].space, SpaceId(1));
    }

    #[test]
    fn test_interaction_segments() {
        let mut seg = Segmenter::new(config(150));
        let mut out = SegmentedOutput::default();
        for i in 0..20u64 {
            let f = frame(i, i as i64 * 100, &[1, 2]);
            let c = (5..=9).contains(&i).then(|| contact(&f, 2, 1));
            out.extend(seg.push(&f, c.as_ref()));
        }
        out.extend(seg.flush());

        assert_eq!(out.interactions.len(), 1);
        let inter = &out.interactions[0];
        assert_eq!(inter.ants, (AntId(1), AntId(2)));
        assert_eq!(inter.types, vec![(1, 1)]);
        assert_eq!((inter.segments.0.begin, inter.segments.0.end), (5, 10));
        assert_eq!(inter.segments.1.samples().map(|s| s.len()), Some(5));
        assert_eq!(inter.start, Time::from_unix_nanos(500 * MS));
        assert_eq!(inter.end, Time::from_unix_nanos(900 * MS));
        assert_eq!(out.trajectories.len(), 2);
    }

    #[test]
    fn test_single_instant_interaction_discarded() {
        let mut seg = Segmenter::new(config(150));
        let mut out = SegmentedOutput::default();
        for i in 0..5u64 {
            let f = frame(i, i as i64 * 100, &[1, 2]);
            let c = (i == 2).then(|| contact(&f, 1, 2));
            out.extend(seg.push(&f, c.as_ref()));
        }
        out.extend(seg.flush());
        assert!(out.interactions.is_empty());
        assert_eq!(out.trajectories.len(), 2);
    }

    #[test]
    fn test_contact_gap_reopens_interaction() {
        let mut seg = Segmenter::new(config(150));
        let mut out = SegmentedOutput::default();
        let contacts = [2, 3, 6, 7];
        for i in 0..10u64 {
            let f = frame(i, i as i64 * 100, &[1, 2]);
            let c = contacts.contains(&i).then(|| contact(&f, 1, 2));
            out.extend(seg.push(&f, c.as_ref()));
        }
        out.extend(seg.flush());
        assert_eq!(out.interactions.len(), 2);
        assert_eq!(out.interactions[0].segments.0.begin, 2);
        assert_eq!(out.interactions[1].segments.0.begin, 6);
    }

    #[test]
    fn test_summarized_segments() {
        let mut seg = Segmenter::new(SegmenterConfig {
            summarize: true,
            ..config(150)
        });
        let mut out = SegmentedOutput::default();
        for i in 0..4u64 {
            let f = frame(i, i as i64 * 100, &[1, 2]);
            out.extend(seg.push(&f, Some(&contact(&f, 1, 2))));
        }
        out.extend(seg.flush());
        assert!(out.interactions[0].segments.0.is_summarized());
        assert!(out.interactions[0].segments.1.is_summarized());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let run = || {
            let mut seg = Segmenter::new(config(150));
            let mut out = SegmentedOutput::default();
            for i in 0..50u64 {
                let ants: Vec<u32> = (1..6).filter(|a| (i + *a as u64) % 7 != 0).collect();
                let f = frame(i, i as i64 * 100, &ants);
                let c = (i % 3 == 0 && ants.contains(&1) && ants.contains(&3))
                    .then(|| contact(&f, 3, 1));
                out.extend(seg.push(&f, c.as_ref()));
            }
            out.extend(seg.flush());
            out
        };
        assert_eq!(run(), run());
    }
}
