//! Annotation interval index.
//!
//! Ranges are kept in a sorted vector (start ascending, end descending, creation sequence
//! ascending) together with a prefix maximum of the end offsets, so a range query is a
//! binary search plus a backward walk that stops as soon as no earlier interval can reach
//! the query start.
//!
//! The shifting rules for text edits live here too, so annotations and render hints move
//! identically.

use std::cmp::Reverse;

/// An indexed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval<K> {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Creation sequence number, the final tie-break of the query order.
    pub seq: u64,
    /// Owner key.
    pub key: K,
}

impl<K> Interval<K> {
    fn sort_key(&self) -> (usize, Reverse<usize>, u64) {
        (self.start, Reverse(self.end), self.seq)
    }
}

/// Sorted interval index with prefix-maximum pruning.
#[derive(Debug, Clone)]
pub struct IntervalIndex<K> {
    intervals: Vec<Interval<K>>,
    /// `prefix_max_end[i] = max(intervals[0..=i].end)`
    prefix_max_end: Vec<usize>,
}

impl<K: Copy + Eq> IntervalIndex<K> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
            prefix_max_end: Vec::new(),
        }
    }

    fn rebuild_prefix_max_end_from(&mut self, start_idx: usize) {
        if self.intervals.is_empty() {
            self.prefix_max_end.clear();
            return;
        }

        if self.prefix_max_end.len() != self.intervals.len() {
            self.prefix_max_end.resize(self.intervals.len(), 0);
        }

        let mut max_end = if start_idx == 0 {
            0
        } else {
            self.prefix_max_end[start_idx - 1]
        };

        for (idx, interval) in self.intervals.iter().enumerate().skip(start_idx) {
            max_end = max_end.max(interval.end);
            self.prefix_max_end[idx] = max_end;
        }
    }

    /// Insert an interval at its sorted position.
    pub fn insert(&mut self, interval: Interval<K>) {
        let key = interval.sort_key();
        let pos = self.intervals.partition_point(|i| i.sort_key() < key);

        self.intervals.insert(pos, interval);
        self.prefix_max_end.insert(pos, 0);
        self.rebuild_prefix_max_end_from(pos);
    }

    /// Remove the interval owned by `key`.
    pub fn remove(&mut self, key: K) -> Option<Interval<K>> {
        let pos = self.intervals.iter().position(|i| i.key == key)?;
        let removed = self.intervals.remove(pos);
        self.prefix_max_end.remove(pos);
        self.rebuild_prefix_max_end_from(pos);
        Some(removed)
    }

    /// Move the interval owned by `key` to a new range, keeping its sequence number.
    pub fn set_range(&mut self, key: K, start: usize, end: usize) -> bool {
        match self.remove(key) {
            Some(interval) => {
                self.insert(Interval {
                    start,
                    end,
                    ..interval
                });
                true
            }
            None => false,
        }
    }

    /// Intervals intersecting `[start, end]`, in index order.
    ///
    /// Closed ranges that meet intersect, except that a non-empty interval touching a
    /// non-empty query at a single boundary does not.
    pub fn query(&self, start: usize, end: usize) -> Vec<&Interval<K>> {
        self.query_impl(start, end).0
    }

    fn query_impl(&self, start: usize, end: usize) -> (Vec<&Interval<K>>, usize) {
        if self.intervals.is_empty() {
            return (Vec::new(), 0);
        }

        let mut result = Vec::new();
        let mut scanned = 0usize;

        // Everything at or after `idx` starts beyond the query.
        let idx = self.intervals.partition_point(|i| i.start <= end);

        for i in (0..idx).rev() {
            scanned = scanned.saturating_add(1);

            // No interval in `intervals[0..=i]` reaches `start`.
            if self.prefix_max_end[i] < start {
                break;
            }

            let interval = &self.intervals[i];
            if crate::annotation::intersects(interval.start, interval.end, start, end) {
                result.push(interval);
            }
        }

        result.reverse();
        (result, scanned)
    }

    #[cfg(test)]
    fn query_scan_count(&self, start: usize, end: usize) -> usize {
        self.query_impl(start, end).1
    }

    /// All intervals, in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Interval<K>> {
        self.intervals.iter()
    }

    /// Get number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    fn resort(&mut self) {
        self.intervals.sort_by_key(Interval::sort_key);
        self.rebuild_prefix_max_end_from(0);
    }

    /// Shift intervals for `delta` units inserted at `pos`. See [`shift_for_insertion`].
    pub fn update_for_insertion(&mut self, pos: usize, delta: usize) {
        if delta == 0 {
            return;
        }
        for interval in &mut self.intervals {
            (interval.start, interval.end) =
                shift_for_insertion(interval.start, interval.end, pos, delta);
        }
        self.resort();
    }

    /// Shift intervals for the deletion of `[start, end)`. See [`shift_for_deletion`].
    ///
    /// Returns the keys of intervals that collapsed and were dropped.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) -> Vec<K> {
        if start >= end {
            return Vec::new();
        }
        let mut removed = Vec::new();
        self.intervals.retain_mut(|interval| {
            match shift_for_deletion(interval.start, interval.end, start, end) {
                Some((s, e)) => {
                    interval.start = s;
                    interval.end = e;
                    true
                }
                None => {
                    removed.push(interval.key);
                    false
                }
            }
        });
        self.resort();
        removed
    }
}

impl<K: Copy + Eq> Default for IntervalIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// New range of `[start, end)` after `delta` units are inserted at `pos`.
///
/// Ranges starting at or after `pos` shift; ranges strictly containing `pos` grow; an empty
/// range sitting at `pos` grows to cover the inserted text. A range ending at `pos` is left
/// alone.
pub fn shift_for_insertion(start: usize, end: usize, pos: usize, delta: usize) -> (usize, usize) {
    if start == pos && end == pos {
        (start, end + delta)
    } else if start >= pos {
        (start + delta, end + delta)
    } else if end > pos {
        (start, end + delta)
    } else {
        (start, end)
    }
}

/// New range of `[start, end)` after `[del_start, del_end)` is deleted, or `None` when the
/// range collapses (an empty range touching the deleted span counts as collapsed).
pub fn shift_for_deletion(
    start: usize,
    end: usize,
    del_start: usize,
    del_end: usize,
) -> Option<(usize, usize)> {
    let map = |offset: usize| {
        if offset <= del_start {
            offset
        } else if offset >= del_end {
            offset - (del_end - del_start)
        } else {
            del_start
        }
    };

    let (new_start, new_end) = (map(start), map(end));
    let touched = start <= del_end && end >= del_start;
    if new_start == new_end && touched {
        None
    } else {
        Some((new_start, new_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(start: usize, end: usize, seq: u64) -> Interval<u64> {
        Interval {
            start,
            end,
            seq,
            key: seq,
        }
    }

    fn keys(results: Vec<&Interval<u64>>) -> Vec<u64> {
        results.into_iter().map(|i| i.key).collect()
    }

    #[test]
    fn test_index_order_breaks_ties_by_length_then_sequence() {
        let mut index = IntervalIndex::new();
        index.insert(interval(0, 5, 1));
        index.insert(interval(0, 10, 2));
        index.insert(interval(0, 5, 3));
        index.insert(interval(2, 3, 4));

        let order: Vec<u64> = index.iter().map(|i| i.key).collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_query_boundary_rules() {
        let mut index = IntervalIndex::new();
        index.insert(interval(0, 5, 1));
        index.insert(interval(5, 10, 2));
        index.insert(interval(5, 5, 3));

        // Non-empty query touching a boundary only sees the side it overlaps.
        assert_eq!(keys(index.query(2, 5)), vec![1, 3]);
        assert_eq!(keys(index.query(5, 7)), vec![2, 3]);
        // Caret query sees both neighbours.
        assert_eq!(keys(index.query(5, 5)), vec![1, 2, 3]);
    }

    #[test]
    fn test_query_prunes_scan() {
        let mut index = IntervalIndex::new();

        // Many disjoint intervals: a query at the tail should only look at a few.
        for i in 0..10_000u64 {
            let start = i as usize * 2;
            index.insert(interval(start, start + 1, i));
        }

        let pos = 2 * 10_000 - 2;
        let results = index.query(pos, pos + 1);
        assert_eq!(results.len(), 1);
        assert!(index.query_scan_count(pos, pos + 1) <= 3);
    }

    #[test]
    fn test_set_range_and_remove() {
        let mut index = IntervalIndex::new();
        index.insert(interval(0, 2, 1));
        index.insert(interval(4, 6, 2));

        assert!(index.set_range(1, 8, 9));
        assert_eq!(keys(index.query(8, 8)), vec![1]);
        assert_eq!(index.iter().next().map(|i| i.key), Some(2));

        assert!(index.remove(2).is_some());
        assert!(index.remove(2).is_none());
        assert!(!index.set_range(2, 0, 1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_update_for_insertion() {
        let mut index = IntervalIndex::new();
        index.insert(interval(0, 3, 1));
        index.insert(interval(3, 6, 2));
        index.insert(interval(1, 5, 3));
        index.insert(interval(3, 3, 4));

        index.update_for_insertion(3, 2);

        let ranges: Vec<(u64, usize, usize)> =
            index.iter().map(|i| (i.key, i.start, i.end)).collect();
        assert_eq!(ranges, vec![(1, 0, 3), (3, 1, 7), (4, 3, 5), (2, 5, 8)]);
    }

    #[test]
    fn test_update_for_deletion() {
        let mut index = IntervalIndex::new();
        index.insert(interval(0, 4, 1));
        index.insert(interval(4, 6, 2));
        index.insert(interval(6, 10, 3));
        index.insert(interval(8, 8, 4));

        let removed = index.update_for_deletion(3, 7);
        assert_eq!(removed, vec![2]);

        let ranges: Vec<(u64, usize, usize)> =
            index.iter().map(|i| (i.key, i.start, i.end)).collect();
        assert_eq!(ranges, vec![(1, 0, 3), (3, 3, 6), (4, 4, 4)]);
    }

    #[test]
    fn test_empty_range_at_deletion_point_is_dropped() {
        assert_eq!(shift_for_deletion(2, 2, 2, 3), None);
        assert_eq!(shift_for_deletion(3, 3, 2, 3), None);
        assert_eq!(shift_for_deletion(5, 5, 2, 3), Some((4, 4)));
        assert_eq!(shift_for_deletion(0, 2, 2, 3), Some((0, 2)));
    }
}
