//! Tag to ant identification.
//!
//! [`MutableIdentifier`] is the single writer of identifications. It keeps
//! them in an arena keyed by [`IdentificationId`] and indexes them twice:
//! per tag (a tag identifies at most one ant at a time) and per ant (an ant
//! carries at most one tag at a time). Queries never see it directly; they
//! work on the immutable [`CompiledIdentifier`] produced by
//! [`MutableIdentifier::compile`].

use std::collections::{BTreeMap, HashMap, HashSet};

use contracts::{
    AntId, IdentificationId, IdentifiedFrame, Interval, PositionedAnt, RawFrame, TagDetection,
    TagId, Time, TimeEdge, ZoneId,
};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::interval_index::{IntervalError, IntervalIndex};

/// Identifier error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("ant id 0 is reserved")]
    InvalidAnt,

    #[error("unknown {0}")]
    UnknownIdentification(IdentificationId),

    #[error("tag index: {0}")]
    Tag(#[source] IntervalError),

    #[error("ant index: {0}")]
    Ant(#[source] IntervalError),
}

pub type Result<T> = std::result::Result<T, IdentifierError>;

/// Rigid transform from the tag to the ant reference point, expressed in the
/// tag frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TagPose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl TagPose {
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self { x, y, angle }
    }

    /// Ant pose `(x, y, angle)` for a tag seen at `detection`.
    #[inline]
    pub fn apply(&self, detection: &TagDetection) -> (f64, f64, f64) {
        let (sin, cos) = detection.angle.sin_cos();
        (
            detection.x + cos * self.x - sin * self.y,
            detection.y + sin * self.x + cos * self.y,
            detection.angle + self.angle,
        )
    }
}

/// A tag worn by an ant over a time interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub id: IdentificationId,
    pub tag: TagId,
    pub ant: AntId,
    pub interval: Interval,
    pub pose: TagPose,
}

/// Editable identification store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutableIdentifier {
    next_id: u32,
    identifications: BTreeMap<IdentificationId, Identification>,
    by_tag: IntervalIndex<TagId, IdentificationId>,
    by_ant: IntervalIndex<AntId, IdentificationId>,
}

impl MutableIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifications.is_empty()
    }

    pub fn get(&self, id: IdentificationId) -> Option<&Identification> {
        self.identifications.get(&id)
    }

    /// Identifies `ant` by `tag` on `[start, end)`.
    ///
    /// # Errors
    /// The interval must be free both for the tag and for the ant.
    #[instrument(name = "identifier_add", skip(self))]
    pub fn add_identification(
        &mut self,
        ant: AntId,
        tag: TagId,
        start: Option<Time>,
        end: Option<Time>,
    ) -> Result<IdentificationId> {
        if !ant.is_valid() {
            return Err(IdentifierError::InvalidAnt);
        }
        let interval = Interval::new(start, end);
        self.by_tag
            .check_insert(&tag, &interval)
            .map_err(IdentifierError::Tag)?;
        self.by_ant
            .check_insert(&ant, &interval)
            .map_err(IdentifierError::Ant)?;

        self.next_id += 1;
        let id = IdentificationId(self.next_id);
        self.by_tag
            .insert(tag, id, interval)
            .map_err(IdentifierError::Tag)?;
        self.by_ant
            .insert(ant, id, interval)
            .map_err(IdentifierError::Ant)?;
        self.identifications.insert(
            id,
            Identification {
                id,
                tag,
                ant,
                interval,
                pose: TagPose::default(),
            },
        );
        debug!(%id, %interval, "Identification added");
        Ok(id)
    }

    #[instrument(name = "identifier_delete", skip(self))]
    pub fn delete_identification(&mut self, id: IdentificationId) -> Result<Identification> {
        let ident = self
            .identifications
            .remove(&id)
            .ok_or(IdentifierError::UnknownIdentification(id))?;
        self.by_tag.remove(&ident.tag, &id);
        self.by_ant.remove(&ident.ant, &id);
        debug!(tag = %ident.tag, ant = %ident.ant, "Identification deleted");
        Ok(ident)
    }

    /// Moves an identification to `interval`, validated against both indexes
    /// before anything changes.
    pub fn set_interval(&mut self, id: IdentificationId, interval: Interval) -> Result<()> {
        let (tag, ant) = {
            let ident = self
                .identifications
                .get(&id)
                .ok_or(IdentifierError::UnknownIdentification(id))?;
            (ident.tag, ident.ant)
        };
        self.by_tag
            .check_update(&tag, &id, &interval)
            .map_err(IdentifierError::Tag)?;
        self.by_ant
            .check_update(&ant, &id, &interval)
            .map_err(IdentifierError::Ant)?;

        self.by_tag
            .update(&tag, &id, interval)
            .map_err(IdentifierError::Tag)?;
        self.by_ant
            .update(&ant, &id, interval)
            .map_err(IdentifierError::Ant)?;
        if let Some(ident) = self.identifications.get_mut(&id) {
            ident.interval = interval;
        }
        debug!(%id, %interval, "Identification interval changed");
        Ok(())
    }

    pub fn set_start(&mut self, id: IdentificationId, start: Option<Time>) -> Result<()> {
        let end = self
            .get(id)
            .ok_or(IdentifierError::UnknownIdentification(id))?
            .interval
            .end;
        self.set_interval(id, Interval::new(start, end))
    }

    pub fn set_end(&mut self, id: IdentificationId, end: Option<Time>) -> Result<()> {
        let start = self
            .get(id)
            .ok_or(IdentifierError::UnknownIdentification(id))?
            .interval
            .start;
        self.set_interval(id, Interval::new(start, end))
    }

    pub fn set_tag_pose(&mut self, id: IdentificationId, pose: TagPose) -> Result<()> {
        let ident = self
            .identifications
            .get_mut(&id)
            .ok_or(IdentifierError::UnknownIdentification(id))?;
        ident.pose = pose;
        Ok(())
    }

    pub fn identification_at(&self, tag: TagId, time: &Time) -> Option<&Identification> {
        let id = self.by_tag.value_at(&tag, time)?;
        self.identifications.get(id)
    }

    pub fn identify(&self, tag: TagId, time: &Time) -> Option<AntId> {
        self.identification_at(tag, time).map(|i| i.ant)
    }

    /// Identifications of `ant` in time order.
    pub fn identifications_for_ant(&self, ant: AntId) -> Vec<&Identification> {
        self.by_ant
            .iter(&ant)
            .filter_map(|(_, id)| self.identifications.get(id))
            .collect()
    }

    /// Identifications of `tag` in time order.
    pub fn identifications_for_tag(&self, tag: TagId) -> Vec<&Identification> {
        self.by_tag
            .iter(&tag)
            .filter_map(|(_, id)| self.identifications.get(id))
            .collect()
    }

    /// Largest interval containing `time` on which `tag` is unused.
    pub fn free_range_containing(&self, tag: TagId, time: &Time) -> Option<Interval> {
        self.by_tag.next_free_region(&tag, time)
    }

    /// Immutable snapshot for queries.
    #[instrument(name = "identifier_compile", skip(self), fields(identifications = self.identifications.len()))]
    pub fn compile(&self) -> CompiledIdentifier {
        let mut tags: HashMap<TagId, Vec<CompiledEntry>> = HashMap::new();
        for tag in self.by_tag.keys() {
            let entries = self
                .by_tag
                .iter(tag)
                .filter_map(|(interval, id)| {
                    self.identifications.get(id).map(|ident| CompiledEntry {
                        interval: *interval,
                        ant: ident.ant,
                        pose: ident.pose,
                    })
                })
                .collect();
            tags.insert(*tag, entries);
        }
        debug!(tags = tags.len(), "Identifier compiled");
        CompiledIdentifier { tags }
    }
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    interval: Interval,
    ant: AntId,
    pose: TagPose,
}

/// Read-only identifier shared by query workers.
#[derive(Debug, Clone, Default)]
pub struct CompiledIdentifier {
    tags: HashMap<TagId, Vec<CompiledEntry>>,
}

impl CompiledIdentifier {
    fn entry_at(&self, tag: TagId, time: &Time) -> Option<&CompiledEntry> {
        let entries = self.tags.get(&tag)?;
        let at = TimeEdge::At(*time);
        let idx = entries.partition_point(|e| e.interval.start_edge() <= at);
        let entry = entries.get(idx.checked_sub(1)?)?;
        entry.interval.contains(time).then_some(entry)
    }

    pub fn identify(&self, tag: TagId, time: &Time) -> Option<AntId> {
        self.entry_at(tag, time).map(|e| e.ant)
    }

    /// Resolves every detection of `frame`. Unidentified tags are dropped; an
    /// ant seen through several tags keeps its first row.
    pub fn identify_frame(&self, frame: &RawFrame) -> IdentifiedFrame {
        let mut seen = HashSet::with_capacity(frame.tags.len());
        let positions = frame
            .tags
            .iter()
            .filter_map(|detection| {
                let entry = self.entry_at(detection.tag, &frame.time)?;
                if !seen.insert(entry.ant) {
                    return None;
                }
                let (x, y, angle) = entry.pose.apply(detection);
                Some(PositionedAnt {
                    ant: entry.ant,
                    x,
                    y,
                    angle,
                    zone: ZoneId::NONE,
                })
            })
            .collect();
        IdentifiedFrame {
            frame_id: frame.frame_id,
            time: frame.time,
            space: frame.space,
            width: frame.width,
            height: frame.height,
            positions,
        }
    }
}
