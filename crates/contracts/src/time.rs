//! Time model
//!
//! A [`Time`] carries the wall clock (ordering key) and, optionally, the
//! monotonic stamp of the acquisition clock that produced it. Durations between
//! two times of the same clock are taken from the monotonic values, which are
//! immune to wall clock adjustments.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use crate::ContractError;

/// Signed duration with nanosecond resolution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Duration(pub i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);
    pub const NANOSECOND: Duration = Duration(1);
    pub const MICROSECOND: Duration = Duration(1_000);
    pub const MILLISECOND: Duration = Duration(1_000_000);
    pub const SECOND: Duration = Duration(1_000_000_000);
    pub const MINUTE: Duration = Duration(60 * 1_000_000_000);
    pub const HOUR: Duration = Duration(3_600 * 1_000_000_000);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    #[inline]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Rounds to the nearest nanosecond; saturates on overflow.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9).round() as i64)
    }

    #[inline]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    #[inline]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1e6
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scales the duration, saturating on overflow.
    #[inline]
    pub const fn mul(self, factor: i64) -> Self {
        Self(self.0.saturating_mul(factor))
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Duration {
    type Output = Duration;
    fn neg(self) -> Duration {
        Duration(self.0.saturating_neg())
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Duration(i64::try_from(value.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}ms", self.as_millis_f64())
    }
}

/// Identity of a monotonic acquisition clock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MonoClockId(pub u32);

/// Reading of a monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonoStamp {
    pub clock: MonoClockId,
    pub nanos: u64,
}

/// Point in time: wall clock plus optional monotonic stamp.
///
/// Ordering is by wall clock; the monotonic stamp only breaks exact ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time {
    /// Nanoseconds since the Unix epoch.
    pub wall_ns: i64,
    /// Monotonic stamp of the acquisition clock, if known.
    pub mono: Option<MonoStamp>,
}

impl Time {
    pub const fn from_unix_nanos(wall_ns: i64) -> Self {
        Self {
            wall_ns,
            mono: None,
        }
    }

    pub fn from_unix_secs_f64(secs: f64) -> Self {
        Self::from_unix_nanos((secs * 1e9).round() as i64)
    }

    /// Attaches a monotonic stamp.
    pub const fn with_mono(self, clock: MonoClockId, nanos: u64) -> Self {
        Self {
            wall_ns: self.wall_ns,
            mono: Some(MonoStamp { clock, nanos }),
        }
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now()).unwrap_or(Self::from_unix_nanos(0))
    }

    /// `None` outside of the representable range (years 1677..2262).
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        dt.timestamp_nanos_opt().map(Self::from_unix_nanos)
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.wall_ns)
    }

    /// Monotonic clock identity, if any.
    pub fn clock(&self) -> Option<MonoClockId> {
        self.mono.map(|m| m.clock)
    }

    /// Two times without monotonic stamps share the (wall) clock identity.
    pub fn same_clock(&self, other: &Time) -> bool {
        match (self.mono, other.mono) {
            (Some(a), Some(b)) => a.clock == b.clock,
            (None, None) => true,
            _ => false,
        }
    }

    /// Shifts both the wall and the monotonic value.
    pub fn add(&self, d: Duration) -> Time {
        Time {
            wall_ns: self.wall_ns.saturating_add(d.0),
            mono: self.mono.map(|m| MonoStamp {
                clock: m.clock,
                nanos: m.nanos.saturating_add_signed(d.0),
            }),
        }
    }

    /// `self - earlier`, from monotonic values when both share a clock.
    pub fn sub(&self, earlier: &Time) -> Duration {
        match (self.mono, earlier.mono) {
            (Some(a), Some(b)) if a.clock == b.clock => {
                let diff = a.nanos as i128 - b.nanos as i128;
                Duration(diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
            }
            _ => Duration(self.wall_ns.saturating_sub(earlier.wall_ns)),
        }
    }

    /// Measurable gap since `earlier`; `None` across a clock discontinuity.
    pub fn gap_since(&self, earlier: &Time) -> Option<Duration> {
        if self.same_clock(earlier) {
            Some(self.sub(earlier))
        } else {
            None
        }
    }

    /// Wall-clock only comparison.
    pub fn before(&self, other: &Time) -> bool {
        self.wall_ns < other.wall_ns
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_datetime().to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl FromStr for Time {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ContractError::invalid_time(s, e.to_string()))?;
        Time::from_datetime(dt.with_timezone(&Utc))
            .ok_or_else(|| ContractError::invalid_time(s, "out of representable range"))
    }
}

/// One edge of an [`Interval`], ordered `NegInfinity < At(_) < PosInfinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeEdge {
    NegInfinity,
    At(Time),
    PosInfinity,
}

/// Half-open time interval `[start, end)`; `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: Option<Time>,
    pub end: Option<Time>,
}

impl Interval {
    pub const fn new(start: Option<Time>, end: Option<Time>) -> Self {
        Self { start, end }
    }

    /// `(-inf, +inf)`.
    pub const fn everywhere() -> Self {
        Self::new(None, None)
    }

    pub const fn since(start: Time) -> Self {
        Self::new(Some(start), None)
    }

    pub const fn until(end: Time) -> Self {
        Self::new(None, Some(end))
    }

    pub const fn between(start: Time, end: Time) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn start_edge(&self) -> TimeEdge {
        self.start.map_or(TimeEdge::NegInfinity, TimeEdge::At)
    }

    pub fn end_edge(&self) -> TimeEdge {
        self.end.map_or(TimeEdge::PosInfinity, TimeEdge::At)
    }

    pub fn contains(&self, t: &Time) -> bool {
        let at = TimeEdge::At(*t);
        self.start_edge() <= at && at < self.end_edge()
    }

    pub fn is_empty(&self) -> bool {
        self.start_edge() >= self.end_edge()
    }

    /// Empty intervals overlap nothing.
    pub fn overlaps(&self, other: &Interval) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start_edge().max(other.start_edge()) < self.end_edge().min(other.end_edge())
    }

    /// Orders by start edge, then end edge.
    pub fn cmp_start(&self, other: &Interval) -> Ordering {
        self.start_edge()
            .cmp(&other.start_edge())
            .then_with(|| self.end_edge().cmp(&other.end_edge()))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(t) => write!(f, "[{t}, ")?,
            None => f.write_str("(-inf, ")?,
        }
        match self.end {
            Some(t) => write!(f, "{t})"),
            None => f.write_str("+inf)"),
        }
    }
}
