//! Frame records flowing through a query
//!
//! Raw frames come from a [`crate::FrameSource`], identified frames from the
//! identifier, collision frames from the collision solver. All of them are
//! transient: owned by the stage currently processing them.

use serde::{Deserialize, Serialize};

use crate::{AntId, FrameId, SpaceId, TagId, Time, ZoneId};

/// Body part type of a capsule.
pub type BodyPartType = u32;

/// Pair of body part types `(type of first ant, type of second ant)`.
pub type InteractionType = (BodyPartType, BodyPartType);

/// One tag sighting in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagDetection {
    pub tag: TagId,
    pub x: f64,
    pub y: f64,
    /// Radians.
    pub angle: f64,
}

/// Frame as read from disk: tag sightings of one space at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub frame_id: FrameId,
    pub time: Time,
    pub space: SpaceId,
    pub width: u32,
    pub height: u32,
    pub tags: Vec<TagDetection>,
}

impl RawFrame {
    pub fn new(frame_id: FrameId, time: Time, space: SpaceId) -> Self {
        Self {
            frame_id,
            time,
            space,
            width: 0,
            height: 0,
            tags: Vec::new(),
        }
    }
}

/// Ant pose resolved from a tag sighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionedAnt {
    pub ant: AntId,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub zone: ZoneId,
}

/// Frame after tag-to-ant resolution. Holds at most one row per ant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedFrame {
    pub frame_id: FrameId,
    pub time: Time,
    pub space: SpaceId,
    pub width: u32,
    pub height: u32,
    pub positions: Vec<PositionedAnt>,
}

impl IdentifiedFrame {
    pub fn position_of(&self, ant: AntId) -> Option<&PositionedAnt> {
        self.positions.iter().find(|p| p.ant == ant)
    }

    pub fn contains(&self, ant: AntId) -> bool {
        self.position_of(ant).is_some()
    }
}

/// Contact between two ants in one frame.
///
/// `ants.0 < ants.1` always holds; `types` is sorted, deduplicated and oriented
/// as `(type on ants.0, type on ants.1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub ants: (AntId, AntId),
    pub types: Vec<InteractionType>,
    pub zone: ZoneId,
}

impl Collision {
    /// Canonical collision. Swaps type pairs along when the ants come in
    /// descending order.
    pub fn new(a: AntId, b: AntId, mut types: Vec<InteractionType>, zone: ZoneId) -> Self {
        let ants = if a <= b {
            (a, b)
        } else {
            for t in &mut types {
                *t = (t.1, t.0);
            }
            (b, a)
        };
        types.sort_unstable();
        types.dedup();
        Self { ants, types, zone }
    }

    pub fn involves(&self, ant: AntId) -> bool {
        self.ants.0 == ant || self.ants.1 == ant
    }
}

/// All collisions of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionFrame {
    pub frame_id: FrameId,
    pub time: Time,
    pub space: SpaceId,
    pub collisions: Vec<Collision>,
}

impl CollisionFrame {
    pub fn empty(frame: &IdentifiedFrame) -> Self {
        Self {
            frame_id: frame.frame_id,
            time: frame.time,
            space: frame.space,
            collisions: Vec::new(),
        }
    }

    pub fn collision_between(&self, a: AntId, b: AntId) -> Option<&Collision> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.collisions.iter().find(|c| c.ants == key)
    }
}
