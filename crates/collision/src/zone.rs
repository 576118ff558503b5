//! Zones: time-valid sub-regions of a space.
//!
//! A zone may change shape over time; each shape is a definition valid on an
//! interval and definitions of one zone never overlap in time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use contracts::{Interval, SpaceId, Time, TimeEdge, ZoneId};
use geometry::{Vec2, ZoneGeometry};
use identification::{IntervalError, IntervalIndex};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    #[error("{0} is reserved")]
    InvalidZone(ZoneId),

    #[error("{0} is reserved")]
    InvalidSpace(SpaceId),

    #[error("unknown zone definition {0}")]
    UnknownDefinition(u32),

    #[error("{zone} of {space}: {source}")]
    Definition {
        space: SpaceId,
        zone: ZoneId,
        #[source]
        source: IntervalError,
    },
}

/// Handle of a zone definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub u32);

#[derive(Debug, Clone)]
struct Definition {
    space: SpaceId,
    zone: ZoneId,
    geometry: Arc<ZoneGeometry>,
}

/// Editable zone definitions of every space.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    next_id: u32,
    definitions: BTreeMap<DefinitionId, Definition>,
    index: IntervalIndex<(SpaceId, ZoneId), DefinitionId>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `zone` of `space` the shape `geometry` on `[start, end)`.
    pub fn add_definition(
        &mut self,
        space: SpaceId,
        zone: ZoneId,
        geometry: ZoneGeometry,
        start: Option<Time>,
        end: Option<Time>,
    ) -> Result<DefinitionId, ZoneError> {
        if !space.is_valid() {
            return Err(ZoneError::InvalidSpace(space));
        }
        if !zone.is_valid() {
            return Err(ZoneError::InvalidZone(zone));
        }
        let interval = Interval::new(start, end);
        let id = DefinitionId(self.next_id + 1);
        self.index
            .insert((space, zone), id, interval)
            .map_err(|source| ZoneError::Definition {
                space,
                zone,
                source,
            })?;
        self.next_id += 1;
        self.definitions.insert(
            id,
            Definition {
                space,
                zone,
                geometry: Arc::new(geometry),
            },
        );
        debug!(%space, %zone, %interval, "Zone definition added");
        Ok(id)
    }

    pub fn remove_definition(&mut self, id: DefinitionId) -> Result<(), ZoneError> {
        let def = self
            .definitions
            .remove(&id)
            .ok_or(ZoneError::UnknownDefinition(id.0))?;
        self.index.remove(&(def.space, def.zone), &id);
        Ok(())
    }

    /// Immutable resolver over the current definitions.
    pub fn compile(&self) -> ZoneResolver {
        let mut spaces: HashMap<SpaceId, Vec<CompiledZone>> = HashMap::new();
        // BTreeMap key order gives ascending zone IDs per space.
        for key in self.index.keys() {
            let definitions = self
                .index
                .iter(key)
                .filter_map(|(interval, id)| {
                    self.definitions
                        .get(id)
                        .map(|d| (*interval, Arc::clone(&d.geometry)))
                })
                .collect();
            spaces.entry(key.0).or_default().push(CompiledZone {
                zone: key.1,
                definitions,
            });
        }
        ZoneResolver { spaces }
    }
}

#[derive(Debug, Clone)]
struct CompiledZone {
    zone: ZoneId,
    definitions: Vec<(Interval, Arc<ZoneGeometry>)>,
}

impl CompiledZone {
    fn geometry_at(&self, time: &Time) -> Option<&ZoneGeometry> {
        let at = TimeEdge::At(*time);
        let idx = self
            .definitions
            .partition_point(|(interval, _)| interval.start_edge() <= at);
        let (interval, geometry) = self.definitions.get(idx.checked_sub(1)?)?;
        interval.contains(time).then_some(geometry.as_ref())
    }
}

/// Read-only point to zone lookup.
#[derive(Debug, Clone, Default)]
pub struct ZoneResolver {
    spaces: HashMap<SpaceId, Vec<CompiledZone>>,
}

impl ZoneResolver {
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// First zone, by ascending ID, containing `point` at `time`;
    /// [`ZoneId::NONE`] otherwise.
    pub fn resolve(&self, space: SpaceId, point: &Vec2, time: &Time) -> ZoneId {
        let Some(zones) = self.spaces.get(&space) else {
            return ZoneId::NONE;
        };
        zones
            .iter()
            .find(|z| z.geometry_at(time).is_some_and(|g| g.contains(point)))
            .map_or(ZoneId::NONE, |z| z.zone)
    }
}
