//! Ant and pair predicates used to prune query results.

use std::f64::consts::{PI, TAU};

use contracts::{AntId, IdentifiedFrame, InteractionType};

/// Predicate over an ant, or a pair of ants, at one frame.
///
/// When evaluated for a single ant, pair-only criteria (distance, angle,
/// interaction type) do not apply: they accept it, negated or not.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Matcher {
    #[default]
    Any,
    /// One of the ants is this one
    AntId(AntId),
    /// The interaction has this type pair, in either order
    InteractionType(u32, u32),
    AntDistanceSmallerThan(f64),
    AntDistanceGreaterThan(f64),
    /// Absolute heading difference in radians
    AntAngleSmallerThan(f64),
    AntAngleGreaterThan(f64),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    pub fn and(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Matcher::And(matchers.into_iter().collect())
    }

    pub fn or(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Matcher::Or(matchers.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(matcher: Matcher) -> Self {
        Matcher::Not(Box::new(matcher))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Matcher::Any)
    }

    /// Evaluates the predicate. `second` is `None` for a single ant.
    pub fn matches(
        &self,
        frame: &IdentifiedFrame,
        first: AntId,
        second: Option<AntId>,
        types: &[InteractionType],
    ) -> bool {
        self.evaluate(frame, first, second, types).unwrap_or(true)
    }

    /// `None` when the predicate does not apply, i.e. a pair criterion on a
    /// single ant. Combinators skip such operands, so `Not` keeps them neutral.
    fn evaluate(
        &self,
        frame: &IdentifiedFrame,
        first: AntId,
        second: Option<AntId>,
        types: &[InteractionType],
    ) -> Option<bool> {
        match self {
            Matcher::Any => Some(true),
            Matcher::AntId(id) => Some(first == *id || second == Some(*id)),
            Matcher::InteractionType(a, b) => second.map(|_| {
                types
                    .iter()
                    .any(|t| *t == (*a, *b) || *t == (*b, *a))
            }),
            Matcher::AntDistanceSmallerThan(d) => {
                pair_metric(frame, first, second, distance).map(|v| v.is_some_and(|v| v < *d))
            }
            Matcher::AntDistanceGreaterThan(d) => {
                pair_metric(frame, first, second, distance).map(|v| v.is_some_and(|v| v > *d))
            }
            Matcher::AntAngleSmallerThan(a) => {
                pair_metric(frame, first, second, angle).map(|v| v.is_some_and(|v| v < *a))
            }
            Matcher::AntAngleGreaterThan(a) => {
                pair_metric(frame, first, second, angle).map(|v| v.is_some_and(|v| v > *a))
            }
            Matcher::And(ms) => {
                if ms.is_empty() {
                    return Some(true);
                }
                let mut result = None;
                for m in ms {
                    match m.evaluate(frame, first, second, types) {
                        Some(false) => return Some(false),
                        Some(true) => result = Some(true),
                        None => {}
                    }
                }
                result
            }
            Matcher::Or(ms) => {
                if ms.is_empty() {
                    return Some(false);
                }
                let mut result = None;
                for m in ms {
                    match m.evaluate(frame, first, second, types) {
                        Some(true) => return Some(true),
                        Some(false) => result = Some(false),
                        None => {}
                    }
                }
                result
            }
            Matcher::Not(m) => m.evaluate(frame, first, second, types).map(|v| !v),
        }
    }
}

/// `None` for a single ant; `Some(None)` when a position is missing.
fn pair_metric(
    frame: &IdentifiedFrame,
    first: AntId,
    second: Option<AntId>,
    metric: fn((f64, f64, f64), (f64, f64, f64)) -> f64,
) -> Option<Option<f64>> {
    let second = second?;
    let pose = |ant| frame.position_of(ant).map(|p| (p.x, p.y, p.angle));
    Some(pose(first).zip(pose(second)).map(|(a, b)| metric(a, b)))
}

fn distance(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn angle(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    let d = (a.2 - b.2).rem_euclid(TAU);
    if d > PI {
        TAU - d
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FrameId, PositionedAnt, SpaceId, Time, ZoneId};

    fn frame() -> IdentifiedFrame {
        let at = |ant, x, angle| PositionedAnt {
            ant: AntId(ant),
            x,
            y: 0.0,
            angle,
            zone: ZoneId::NONE,
        };
        IdentifiedFrame {
            frame_id: FrameId(0),
            time: Time::from_unix_nanos(0),
            space: SpaceId(1),
            width: 0,
            height: 0,
            positions: vec![at(1, 0.0, 0.1), at(2, 30.0, TAU - 0.1), at(3, 100.0, PI)],
        }
    }

    #[test]
    fn test_ant_id() {
        let f = frame();
        let m = Matcher::AntId(AntId(2));
        assert!(m.matches(&f, AntId(2), None, &[]));
        assert!(m.matches(&f, AntId(1), Some(AntId(2)), &[]));
        assert!(!m.matches(&f, AntId(1), Some(AntId(3)), &[]));
    }

    #[test]
    fn test_distance_and_angle() {
        let f = frame();
        assert!(Matcher::AntDistanceSmallerThan(50.0).matches(&f, AntId(1), Some(AntId(2)), &[]));
        assert!(!Matcher::AntDistanceSmallerThan(50.0).matches(&f, AntId(1), Some(AntId(3)), &[]));
        assert!(Matcher::AntDistanceGreaterThan(50.0).matches(&f, AntId(1), Some(AntId(3)), &[]));
        // Headings wrap around.
        assert!(Matcher::AntAngleSmallerThan(0.3).matches(&f, AntId(1), Some(AntId(2)), &[]));
        assert!(Matcher::AntAngleGreaterThan(3.0).matches(&f, AntId(1), Some(AntId(3)), &[]));
        // Pair criteria accept single ants, missing ants fail.
        assert!(Matcher::AntDistanceGreaterThan(1e9).matches(&f, AntId(1), None, &[]));
        assert!(!Matcher::AntDistanceSmallerThan(1e9).matches(&f, AntId(1), Some(AntId(9)), &[]));
    }

    #[test]
    fn test_interaction_type_either_order() {
        let f = frame();
        let m = Matcher::InteractionType(2, 1);
        assert!(m.matches(&f, AntId(1), Some(AntId(2)), &[(1, 2)]));
        assert!(!m.matches(&f, AntId(1), Some(AntId(2)), &[(1, 1)]));
        assert!(m.matches(&f, AntId(1), None, &[]));
    }

    #[test]
    fn test_combinators() {
        let f = frame();
        let m = Matcher::and([
            Matcher::or([Matcher::AntId(AntId(1)), Matcher::AntId(AntId(3))]),
            Matcher::not(Matcher::AntId(AntId(2))),
        ]);
        assert!(m.matches(&f, AntId(1), None, &[]));
        assert!(m.matches(&f, AntId(3), None, &[]));
        assert!(!m.matches(&f, AntId(2), None, &[]));
        assert!(!m.matches(&f, AntId(1), Some(AntId(2)), &[]));
        assert!(Matcher::And(vec![]).matches(&f, AntId(1), None, &[]));
        assert!(!Matcher::Or(vec![]).matches(&f, AntId(1), None, &[]));
    }

    #[test]
    fn test_negated_pair_criteria_keep_single_ants() {
        let f = frame();
        let not_type = Matcher::not(Matcher::InteractionType(2, 2));
        assert!(not_type.matches(&f, AntId(1), None, &[]));
        assert!(not_type.matches(&f, AntId(1), Some(AntId(2)), &[(1, 1)]));
        assert!(!not_type.matches(&f, AntId(1), Some(AntId(2)), &[(2, 2)]));

        let not_close = Matcher::not(Matcher::AntDistanceSmallerThan(50.0));
        assert!(not_close.matches(&f, AntId(2), None, &[]));
        assert!(!not_close.matches(&f, AntId(1), Some(AntId(2)), &[]));

        // Inapplicable operands are skipped, applicable ones still decide.
        let mixed = Matcher::and([
            Matcher::not(Matcher::InteractionType(2, 2)),
            Matcher::AntId(AntId(3)),
        ]);
        assert!(mixed.matches(&f, AntId(3), None, &[]));
        assert!(!mixed.matches(&f, AntId(1), None, &[]));
        assert!(Matcher::or([Matcher::not(Matcher::AntAngleSmallerThan(0.3))]).matches(
            &f,
            AntId(1),
            None,
            &[]
        ));
    }
}
