use smallvec::SmallVec;

use crate::core::TimeRange;

/// Sorted, disjoint, coalesced set of half-open time intervals.
///
/// Bounds are stored as two parallel vectors so merge and query sweeps walk
/// contiguous memory. Touching intervals (`a.to_ms == b.from_ms`) are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    starts: Vec<i64>,
    ends: Vec<i64>,
}

impl IntervalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from arbitrary ranges with one sort and one sweep.
    #[must_use]
    pub fn from_ranges(ranges: impl IntoIterator<Item = TimeRange>) -> Self {
        let mut ranges: Vec<TimeRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        ranges.sort_unstable_by_key(|r| r.from_ms());

        let mut set = Self::default();
        for range in ranges {
            match set.ends.last_mut() {
                Some(end) if range.from_ms() <= *end => {
                    *end = (*end).max(range.to_ms());
                }
                _ => {
                    set.starts.push(range.from_ms());
                    set.ends.push(range.to_ms());
                }
            }
        }
        set
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn clear(&mut self) {
        self.starts.clear();
        self.ends.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = TimeRange> + ExactSizeIterator + '_ {
        self.starts
            .iter()
            .zip(&self.ends)
            .map(|(&from_ms, &to_ms)| TimeRange::spanning(from_ms, to_ms))
    }

    /// Index span of intervals that share at least one millisecond with `range`.
    fn overlapping(&self, range: TimeRange) -> (usize, usize) {
        let first = self.ends.partition_point(|end| *end <= range.from_ms());
        let last = self.starts.partition_point(|start| *start < range.to_ms());
        (first, last.max(first))
    }

    /// Index span of intervals that overlap or touch `range`.
    fn adjoining(&self, range: TimeRange) -> (usize, usize) {
        let first = self.ends.partition_point(|end| *end < range.from_ms());
        let last = self.starts.partition_point(|start| *start <= range.to_ms());
        (first, last.max(first))
    }

    fn replace(&mut self, first: usize, last: usize, with: &[TimeRange]) {
        self.starts
            .splice(first..last, with.iter().map(|r| r.from_ms()));
        self.ends.splice(first..last, with.iter().map(|r| r.to_ms()));
    }

    /// Adds `range`, coalescing with every interval it overlaps or touches.
    pub fn insert(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        let (first, last) = self.adjoining(range);
        let mut from_ms = range.from_ms();
        let mut to_ms = range.to_ms();
        if first < last {
            from_ms = from_ms.min(self.starts[first]);
            to_ms = to_ms.max(self.ends[last - 1]);
        }
        self.replace(first, last, &[TimeRange::spanning(from_ms, to_ms)]);
    }

    /// Removes `range`, narrowing intervals that straddle its edges.
    pub fn remove(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        let (first, last) = self.overlapping(range);
        if first == last {
            return;
        }
        let mut remnants: SmallVec<[TimeRange; 2]> = SmallVec::new();
        if self.starts[first] < range.from_ms() {
            remnants.push(TimeRange::spanning(self.starts[first], range.from_ms()));
        }
        if self.ends[last - 1] > range.to_ms() {
            remnants.push(TimeRange::spanning(range.to_ms(), self.ends[last - 1]));
        }
        self.replace(first, last, &remnants);
    }

    /// Sub-ranges of `range` not covered by the set, left to right.
    #[must_use]
    pub fn gaps(&self, range: TimeRange) -> Vec<TimeRange> {
        let mut gaps = Vec::new();
        if range.is_empty() {
            return gaps;
        }
        let (first, last) = self.overlapping(range);
        let mut cursor = range.from_ms();
        for index in first..last {
            let start = self.starts[index];
            if start > cursor {
                gaps.push(TimeRange::spanning(cursor, start));
            }
            cursor = cursor.max(self.ends[index]);
        }
        if cursor < range.to_ms() {
            gaps.push(TimeRange::spanning(cursor, range.to_ms()));
        }
        gaps
    }

    /// Parts of the set that fall inside `range`, clipped to it.
    pub fn clipped(&self, range: TimeRange) -> impl Iterator<Item = TimeRange> + '_ {
        let (first, last) = self.overlapping(range);
        (first..last).filter_map(move |index| {
            TimeRange::spanning(self.starts[index], self.ends[index]).intersect(range)
        })
    }

    /// Milliseconds of `range` covered by the set.
    #[must_use]
    pub fn covered_ms(&self, range: TimeRange) -> u64 {
        self.clipped(range).map(TimeRange::len_ms).sum()
    }

    /// Returns `true` when one interval of the set contains all of `range`.
    #[must_use]
    pub fn contains_range(&self, range: TimeRange) -> bool {
        if range.is_empty() {
            return true;
        }
        let index = self.ends.partition_point(|end| *end < range.to_ms());
        index < self.starts.len() && self.starts[index] <= range.from_ms()
    }

    #[must_use]
    pub fn intersects(&self, range: TimeRange) -> bool {
        let (first, last) = self.overlapping(range);
        first < last
    }
}
