//! Open trajectories and interactions.
//!
//! Open trajectories live in a `Slab`; interactions refer to them by slab key
//! and sample index only, so nothing is shared while a trajectory grows.

use std::collections::BTreeSet;
use std::fmt;

use contracts::{
    AntId, AntInteraction, AntTrajectory, Duration, InteractionType, PositionedAnt, SpaceId, Time,
    TrajectorySample,
};

/// Trajectory still accepting samples.
pub(crate) struct BuildingTrajectory {
    pub trajectory: AntTrajectory,
    /// Time of the last sample
    pub last: Time,
    /// Emit even with a single sample (an interaction refers to it)
    pub force_keep: bool,
}

impl fmt::Debug for BuildingTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildingTrajectory")
            .field("ant", &self.trajectory.ant)
            .field("space", &self.trajectory.space)
            .field("len", &self.trajectory.samples.len())
            .field("force_keep", &self.force_keep)
            .finish()
    }
}

impl BuildingTrajectory {
    pub fn open(space: SpaceId, time: Time, position: &PositionedAnt) -> Self {
        Self {
            trajectory: AntTrajectory {
                ant: position.ant,
                space,
                start: time,
                samples: vec![sample(0.0, position)],
            },
            last: time,
            force_keep: false,
        }
    }

    /// `true` when a sample at `time` in `space` continues this trajectory.
    pub fn continues(&self, space: SpaceId, time: &Time, max_gap: Duration) -> bool {
        if self.trajectory.space != space {
            return false;
        }
        match time.gap_since(&self.last) {
            Some(gap) => gap > Duration::ZERO && gap <= max_gap,
            None => false,
        }
    }

    pub fn append(&mut self, time: Time, position: &PositionedAnt) {
        let offset = time.sub(&self.trajectory.start).as_secs_f64();
        self.trajectory.samples.push(sample(offset, position));
        self.last = time;
    }

    /// Index of the newest sample.
    pub fn current_index(&self) -> usize {
        self.trajectory.samples.len().saturating_sub(1)
    }

    pub fn is_stale(&self, now: &Time, max_gap: Duration) -> bool {
        now.sub(&self.last) > max_gap
    }

    pub fn is_worth_keeping(&self) -> bool {
        self.force_keep || self.trajectory.samples.len() >= 2
    }
}

fn sample(offset: f64, position: &PositionedAnt) -> TrajectorySample {
    TrajectorySample {
        offset,
        x: position.x,
        y: position.y,
        angle: position.angle,
        zone: position.zone,
    }
}

/// Interaction still accepting contacts.
#[derive(Debug, Clone)]
pub(crate) struct BuildingInteraction {
    pub ants: (AntId, AntId),
    /// Slab keys of both trajectories
    pub keys: (usize, usize),
    pub types: BTreeSet<InteractionType>,
    pub begin: (usize, usize),
    pub end: (usize, usize),
    pub start: Time,
    pub last: Time,
}

impl BuildingInteraction {
    pub fn is_single_instant(&self) -> bool {
        self.begin == self.end
    }

    /// Builds the output, copying the referenced samples.
    pub fn finish(
        self,
        first: &AntTrajectory,
        second: &AntTrajectory,
        summarize: bool,
    ) -> AntInteraction {
        let mut interaction = AntInteraction {
            ants: self.ants,
            types: self.types.into_iter().collect(),
            segments: (
                first.segment(self.begin.0, self.end.0),
                second.segment(self.begin.1, self.end.1),
            ),
            space: first.space,
            start: self.start,
            end: self.last,
        };
        if summarize {
            interaction.summarize();
        }
        interaction
    }
}
