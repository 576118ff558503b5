//! IntervalIndex: per-key sorted, disjoint, half-open `[start, end)` intervals.
//!
//! Invariants (always held, per key):
//!    - entries are sorted by start
//!    - no two entries overlap
//!    - no entry is empty
//!
//! Every mutation validates before it touches the store, so a failed call
//! leaves the index unchanged.
//!
//! Complexity: point lookups and overlap checks are `O(log n)` in the number of
//! entries of the key; insertion and removal are `O(n)` (vector shift).

use std::collections::BTreeMap;
use std::fmt::Debug;

use contracts::{Interval, Time, TimeEdge};
use thiserror::Error;

/// A rejected interval intersects one already stored for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interval {rejected} of {key} overlaps existing {existing}")]
pub struct OverlapError {
    pub key: String,
    pub existing: Interval,
    pub rejected: Interval,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error(transparent)]
    Overlap(#[from] OverlapError),

    #[error("empty interval {interval} for {key}")]
    Empty { key: String, interval: Interval },

    #[error("no entry for {key}")]
    NotFound { key: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<V> {
    interval: Interval,
    value: V,
}

/// Values of type `V` attached to disjoint time intervals, grouped by key.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalIndex<K, V> {
    entries: BTreeMap<K, Vec<Entry<V>>>,
}

impl<K, V> Default for IntervalIndex<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K, V> IntervalIndex<K, V>
where
    K: Ord + Copy + Debug,
    V: PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with at least one entry.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Entries of `key` in time order.
    pub fn iter(&self, key: &K) -> impl Iterator<Item = (&Interval, &V)> {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|v| v.iter().map(|e| (&e.interval, &e.value)))
    }

    /// First stored interval of `key` overlapping `interval`, skipping the
    /// entry holding `ignore`.
    fn find_overlap(&self, key: &K, interval: &Interval, ignore: Option<&V>) -> Option<Interval> {
        let list = self.entries.get(key)?;
        let start = interval.start_edge();
        let end = interval.end_edge();
        // First entry ending after the start of `interval`.
        let first = list.partition_point(|e| e.interval.end_edge() <= start);
        list[first..]
            .iter()
            .take_while(|e| e.interval.start_edge() < end)
            .find(|e| ignore != Some(&e.value))
            .map(|e| e.interval)
    }

    fn validate(&self, key: &K, interval: &Interval, ignore: Option<&V>) -> Result<(), IntervalError> {
        if interval.is_empty() {
            return Err(IntervalError::Empty {
                key: format!("{key:?}"),
                interval: *interval,
            });
        }
        match self.find_overlap(key, interval, ignore) {
            Some(existing) => Err(OverlapError {
                key: format!("{key:?}"),
                existing,
                rejected: *interval,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Validation phase of [`IntervalIndex::insert`].
    pub fn check_insert(&self, key: &K, interval: &Interval) -> Result<(), IntervalError> {
        self.validate(key, interval, None)
    }

    /// Stores `value` for `key` on `interval`.
    pub fn insert(&mut self, key: K, value: V, interval: Interval) -> Result<(), IntervalError> {
        self.check_insert(&key, &interval)?;
        let list = self.entries.entry(key).or_default();
        let at = list.partition_point(|e| e.interval.start_edge() < interval.start_edge());
        list.insert(at, Entry { interval, value });
        debug_assert!(Self::are_invariants_held(list));
        Ok(())
    }

    /// Validation phase of [`IntervalIndex::update`]: the entry of `value`
    /// itself does not count as a conflict.
    pub fn check_update(&self, key: &K, value: &V, interval: &Interval) -> Result<(), IntervalError> {
        if self.position(key, value).is_none() {
            return Err(IntervalError::NotFound {
                key: format!("{key:?}"),
            });
        }
        self.validate(key, interval, Some(value))
    }

    /// Moves the entry of `value` to `interval`.
    pub fn update(&mut self, key: &K, value: &V, interval: Interval) -> Result<(), IntervalError> {
        self.check_update(key, value, &interval)?;
        let Some(list) = self.entries.get_mut(key) else {
            return Err(IntervalError::NotFound {
                key: format!("{key:?}"),
            });
        };
        let Some(from) = list.iter().position(|e| &e.value == value) else {
            return Err(IntervalError::NotFound {
                key: format!("{key:?}"),
            });
        };
        let mut entry = list.remove(from);
        entry.interval = interval;
        let at = list.partition_point(|e| e.interval.start_edge() < interval.start_edge());
        list.insert(at, entry);
        debug_assert!(Self::are_invariants_held(list));
        Ok(())
    }

    /// Removes the entry of `value`, returning its interval.
    pub fn remove(&mut self, key: &K, value: &V) -> Option<Interval> {
        let list = self.entries.get_mut(key)?;
        let at = list.iter().position(|e| &e.value == value)?;
        let entry = list.remove(at);
        if list.is_empty() {
            self.entries.remove(key);
        }
        Some(entry.interval)
    }

    fn position(&self, key: &K, value: &V) -> Option<usize> {
        self.entries.get(key)?.iter().position(|e| &e.value == value)
    }

    /// Entry of `key` valid at `time`.
    pub fn entry_at(&self, key: &K, time: &Time) -> Option<(&Interval, &V)> {
        let list = self.entries.get(key)?;
        let at = TimeEdge::At(*time);
        let idx = list.partition_point(|e| e.interval.start_edge() <= at);
        let entry = list.get(idx.checked_sub(1)?)?;
        entry
            .interval
            .contains(time)
            .then_some((&entry.interval, &entry.value))
    }

    /// Value of `key` valid at `time`.
    pub fn value_at(&self, key: &K, time: &Time) -> Option<&V> {
        self.entry_at(key, time).map(|(_, v)| v)
    }

    /// Largest free interval of `key` containing `near`; `None` when `near`
    /// is already covered.
    pub fn next_free_region(&self, key: &K, near: &Time) -> Option<Interval> {
        let Some(list) = self.entries.get(key) else {
            return Some(Interval::everywhere());
        };
        if self.entry_at(key, near).is_some() {
            return None;
        }
        let at = TimeEdge::At(*near);
        let idx = list.partition_point(|e| e.interval.start_edge() <= at);
        let start = idx
            .checked_sub(1)
            .and_then(|i| list.get(i))
            .and_then(|e| e.interval.end);
        let end = list.get(idx).and_then(|e| e.interval.start);
        Some(Interval::new(start, end))
    }

    fn are_invariants_held(list: &[Entry<V>]) -> bool {
        list.iter().all(|e| !e.interval.is_empty())
            && list
                .windows(2)
                .all(|w| w[0].interval.end_edge() <= w[1].interval.start_edge())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: i64) -> Time {
        Time::from_unix_nanos(s * 1_000_000_000)
    }

    fn iv(a: i64, b: i64) -> Interval {
        Interval::between(t(a), t(b))
    }

    #[test]
    fn test_insert_rejects_overlap_and_keeps_state() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        index.insert(1, 10, iv(0, 10)).unwrap();
        index.insert(1, 11, iv(10, 20)).unwrap();

        let err = index.insert(1, 12, iv(5, 15)).unwrap_err();
        match err {
            IntervalError::Overlap(e) => {
                assert_eq!(e.existing, iv(0, 10));
                assert_eq!(e.rejected, iv(5, 15));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(index.iter(&1).count(), 2);

        // Other keys are independent.
        index.insert(2, 20, iv(5, 15)).unwrap();
    }

    #[test]
    fn test_unbounded_intervals() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        index.insert(1, 1, Interval::until(t(0))).unwrap();
        index.insert(1, 2, Interval::since(t(0))).unwrap();
        assert!(index.check_insert(&1, &iv(-1, 1)).is_err());
        assert_eq!(index.value_at(&1, &t(-100)), Some(&1));
        assert_eq!(index.value_at(&1, &t(0)), Some(&2));
    }

    #[test]
    fn test_empty_interval_rejected() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        assert!(matches!(
            index.insert(1, 1, iv(3, 3)),
            Err(IntervalError::Empty { .. })
        ));
    }

    #[test]
    fn test_value_at_half_open() {
        let mut index: IntervalIndex<u32, &str> = IntervalIndex::new();
        index.insert(7, "a", iv(0, 10)).unwrap();
        index.insert(7, "b", iv(20, 30)).unwrap();
        assert_eq!(index.value_at(&7, &t(0)), Some(&"a"));
        assert_eq!(index.value_at(&7, &t(10)), None);
        assert_eq!(index.value_at(&7, &t(25)), Some(&"b"));
        assert_eq!(index.value_at(&7, &t(-1)), None);
        assert_eq!(index.value_at(&8, &t(5)), None);
    }

    #[test]
    fn test_update_ignores_self() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        index.insert(1, 1, iv(0, 10)).unwrap();
        index.insert(1, 2, iv(20, 30)).unwrap();

        index.update(&1, &1, iv(5, 20)).unwrap();
        assert_eq!(index.value_at(&1, &t(15)), Some(&1));

        assert!(index.update(&1, &1, iv(5, 21)).is_err());
        assert_eq!(index.value_at(&1, &t(15)), Some(&1));
        assert!(matches!(
            index.update(&1, &9, iv(40, 50)),
            Err(IntervalError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_reorders() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        index.insert(1, 1, iv(0, 10)).unwrap();
        index.insert(1, 2, iv(20, 30)).unwrap();
        index.update(&1, &1, iv(40, 50)).unwrap();
        let order: Vec<u32> = index.iter(&1).map(|(_, v)| *v).collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn test_remove() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        index.insert(1, 1, iv(0, 10)).unwrap();
        assert_eq!(index.remove(&1, &1), Some(iv(0, 10)));
        assert_eq!(index.remove(&1, &1), None);
        assert_eq!(index.key_count(), 0);
    }

    #[test]
    fn test_next_free_region() {
        let mut index: IntervalIndex<u32, u32> = IntervalIndex::new();
        assert_eq!(index.next_free_region(&1, &t(0)), Some(Interval::everywhere()));

        index.insert(1, 1, iv(0, 10)).unwrap();
        index.insert(1, 2, iv(20, 30)).unwrap();
        assert_eq!(index.next_free_region(&1, &t(5)), None);
        assert_eq!(index.next_free_region(&1, &t(15)), Some(iv(10, 20)));
        assert_eq!(index.next_free_region(&1, &t(10)), Some(iv(10, 20)));
        assert_eq!(
            index.next_free_region(&1, &t(-5)),
            Some(Interval::until(t(0)))
        );
        assert_eq!(
            index.next_free_region(&1, &t(35)),
            Some(Interval::since(t(30)))
        );
    }
}
