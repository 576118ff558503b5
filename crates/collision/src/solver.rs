//! Per-frame zone resolution and body part collision detection.

use std::collections::{BTreeMap, HashMap, HashSet};

use contracts::{
    AntId, BodyPartType, Collision, CollisionFrame, IdentifiedFrame, InteractionType,
    PositionedAnt, ZoneId,
};
use geometry::{Aabb, Capsule, Vec2};
use tracing::trace;

use crate::zone::ZoneResolver;

/// Body part capsules of every ant, in the ant's own frame.
#[derive(Debug, Clone, Default)]
pub struct AntShapes {
    shapes: HashMap<AntId, Vec<(BodyPartType, Capsule)>>,
}

impl AntShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_capsule(&mut self, ant: AntId, part: BodyPartType, capsule: Capsule) {
        self.shapes.entry(ant).or_default().push((part, capsule));
    }

    pub fn clear_shape(&mut self, ant: AntId) {
        self.shapes.remove(&ant);
    }

    pub fn shape_of(&self, ant: AntId) -> &[(BodyPartType, Capsule)] {
        self.shapes.get(&ant).map_or(&[], Vec::as_slice)
    }
}

/// Body part pairs to test. An empty filter accepts every pair.
///
/// Pairs are unordered: `(1, 2)` also accepts `(2, 1)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeFilter {
    pairs: HashSet<InteractionType>,
}

impl TypeFilter {
    pub fn new(pairs: impl IntoIterator<Item = InteractionType>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[inline]
    pub fn allows(&self, a: BodyPartType, b: BodyPartType) -> bool {
        self.pairs.is_empty() || self.pairs.contains(&(a, b)) || self.pairs.contains(&(b, a))
    }

    /// `false` when no part of `a` may be tested against a part of `b`.
    fn any_allowed(&self, a: &[(BodyPartType, Capsule)], b: &[(BodyPartType, Capsule)]) -> bool {
        self.pairs.is_empty()
            || a.iter()
                .any(|(ta, _)| b.iter().any(|(tb, _)| self.allows(*ta, *tb)))
    }
}

/// Capsules of one ant moved into image coordinates.
struct PlacedAnt {
    ant: AntId,
    parts: Vec<(BodyPartType, Capsule)>,
    bounds: Aabb,
}

impl PlacedAnt {
    fn new(position: &PositionedAnt, shape: &[(BodyPartType, Capsule)]) -> Self {
        let center = Vec2::new(position.x, position.y);
        let parts: Vec<_> = shape
            .iter()
            .map(|(part, capsule)| (*part, capsule.transformed(&center, position.angle)))
            .collect();
        let bounds = parts
            .iter()
            .fold(Aabb::empty(), |acc, (_, c)| acc.union(&c.bounding_box()));
        Self {
            ant: position.ant,
            parts,
            bounds,
        }
    }
}

/// Immutable solver built once per query.
#[derive(Debug, Clone, Default)]
pub struct CollisionSolver {
    zones: ZoneResolver,
    shapes: AntShapes,
    filter: TypeFilter,
}

impl CollisionSolver {
    pub fn new(zones: ZoneResolver, shapes: AntShapes, filter: TypeFilter) -> Self {
        Self {
            zones,
            shapes,
            filter,
        }
    }

    /// Sets the zone of every position of `frame`.
    pub fn resolve_zones(&self, frame: &mut IdentifiedFrame) {
        for p in &mut frame.positions {
            p.zone = self
                .zones
                .resolve(frame.space, &Vec2::new(p.x, p.y), &frame.time);
        }
    }

    /// Resolves zones, then tests every pair of ants sharing a zone.
    pub fn collide(&self, frame: &mut IdentifiedFrame) -> CollisionFrame {
        self.resolve_zones(frame);

        let mut partitions: BTreeMap<ZoneId, Vec<PlacedAnt>> = BTreeMap::new();
        for p in &frame.positions {
            let shape = self.shapes.shape_of(p.ant);
            if shape.is_empty() {
                continue;
            }
            partitions
                .entry(p.zone)
                .or_default()
                .push(PlacedAnt::new(p, shape));
        }

        let mut out = CollisionFrame::empty(frame);
        for (zone, ants) in &partitions {
            for (i, a) in ants.iter().enumerate() {
                for b in &ants[i + 1..] {
                    if let Some(collision) = self.collide_pair(a, b, *zone) {
                        out.collisions.push(collision);
                    }
                }
            }
        }
        out.collisions.sort_by_key(|c| c.ants);
        trace!(
            frame = %frame.frame_id,
            collisions = out.collisions.len(),
            "Frame collided"
        );
        out
    }

    fn collide_pair(&self, a: &PlacedAnt, b: &PlacedAnt, zone: ZoneId) -> Option<Collision> {
        if !a.bounds.intersects(&b.bounds) || !self.filter.any_allowed(&a.parts, &b.parts) {
            return None;
        }
        let mut types = Vec::new();
        for (ta, ca) in &a.parts {
            for (tb, cb) in &b.parts {
                if self.filter.allows(*ta, *tb) && ca.intersects(cb) {
                    types.push((*ta, *tb));
                }
            }
        }
        if types.is_empty() {
            return None;
        }
        Some(Collision::new(a.ant, b.ant, types, zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZoneRegistry;
    use contracts::{FrameId, SpaceId, Time};
    use geometry::{Polygon, ZoneGeometry};

    const HEAD: BodyPartType = 1;
    const BODY: BodyPartType = 2;

    fn shapes(ants: &[u32]) -> AntShapes {
        let mut shapes = AntShapes::new();
        for ant in ants {
            shapes.add_capsule(
                AntId(*ant),
                HEAD,
                Capsule::new(Vec2::new(2.0, 0.0), Vec2::new(3.0, 0.0), 0.5, 0.5),
            );
            shapes.add_capsule(
                AntId(*ant),
                BODY,
                Capsule::new(Vec2::new(-2.0, 0.0), Vec2::new(1.0, 0.0), 0.8, 0.8),
            );
        }
        shapes
    }

    fn frame(positions: &[(u32, f64, f64, f64)]) -> IdentifiedFrame {
        IdentifiedFrame {
            frame_id: FrameId(1),
            time: Time::from_unix_nanos(0),
            space: SpaceId(1),
            width: 100,
            height: 100,
            positions: positions
                .iter()
                .map(|&(ant, x, y, angle)| PositionedAnt {
                    ant: AntId(ant),
                    x,
                    y,
                    angle,
                    zone: ZoneId::NONE,
                })
                .collect(),
        }
    }

    #[test]
    fn test_head_to_body_is_canonical() {
        let solver = CollisionSolver::new(ZoneResolver::default(), shapes(&[1, 2]), TypeFilter::default());
        // Ant 2 faces ant 1's body with its head: 2 at x=5 facing -x.
        let mut f = frame(&[(2, 5.0, 0.0, std::f64::consts::PI), (1, 0.0, 0.0, 0.0)]);
        let out = solver.collide(&mut f);
        assert_eq!(out.collisions.len(), 1);
        let c = &out.collisions[0];
        assert_eq!(c.ants, (AntId(1), AntId(2)));
        // Types oriented (part of ant 1, part of ant 2).
        assert!(c.types.contains(&(BODY, HEAD)));
        assert!(c.types.contains(&(HEAD, HEAD)));
        assert!(c.types.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_far_apart() {
        let solver = CollisionSolver::new(ZoneResolver::default(), shapes(&[1, 2]), TypeFilter::default());
        let mut f = frame(&[(1, 0.0, 0.0, 0.0), (2, 50.0, 0.0, 0.0)]);
        assert!(solver.collide(&mut f).collisions.is_empty());
    }

    #[test]
    fn test_type_filter() {
        let filter = TypeFilter::new([(HEAD, HEAD)]);
        let solver = CollisionSolver::new(ZoneResolver::default(), shapes(&[1, 2]), filter);
        let mut f = frame(&[(1, 0.0, 0.0, 0.0), (2, 5.0, 0.0, std::f64::consts::PI)]);
        let out = solver.collide(&mut f);
        assert_eq!(out.collisions[0].types, vec![(HEAD, HEAD)]);

        // Side by side, only bodies touch: filtered out.
        let mut f = frame(&[(1, 0.0, 0.0, 0.0), (2, 0.0, 1.5, 0.0)]);
        assert!(solver.collide(&mut f).collisions.is_empty());
    }

    #[test]
    fn test_different_zones_never_collide() {
        let mut registry = ZoneRegistry::new();
        registry
            .add_definition(
                SpaceId(1),
                ZoneId(1),
                ZoneGeometry::new(vec![Polygon::new(vec![
                    Vec2::new(-10.0, -10.0),
                    Vec2::new(0.5, -10.0),
                    Vec2::new(0.5, 10.0),
                    Vec2::new(-10.0, 10.0),
                ])
                .into()]),
                None,
                None,
            )
            .unwrap();
        let solver = CollisionSolver::new(registry.compile(), shapes(&[1, 2]), TypeFilter::default());
        let mut f = frame(&[(1, 0.0, 0.0, 0.0), (2, 1.0, 1.0, 0.0)]);
        let out = solver.collide(&mut f);
        assert!(out.collisions.is_empty());
        assert_eq!(f.positions[0].zone, ZoneId(1));
        assert_eq!(f.positions[1].zone, ZoneId::NONE);
    }

    #[test]
    fn test_ants_without_shape_skipped() {
        let solver = CollisionSolver::new(ZoneResolver::default(), shapes(&[1]), TypeFilter::default());
        let mut f = frame(&[(1, 0.0, 0.0, 0.0), (2, 0.0, 0.0, 0.0)]);
        assert!(solver.collide(&mut f).collisions.is_empty());
    }
}
