use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{BucketLevel, Field, IntervalSet, TimeRange};

/// Addressing key shared by coverage and bin storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub field: Field,
    pub level: BucketLevel,
}

impl SeriesKey {
    #[must_use]
    pub fn new(field: Field, level: BucketLevel) -> Self {
        Self { field, level }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageState {
    Loaded,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageInterval {
    pub range: TimeRange,
    pub level: BucketLevel,
    pub state: CoverageState,
}

/// Fetch bookkeeping for one `(field, level)` series.
///
/// Each state keeps its own coalesced set and the three sets never overlap:
/// `Loaded` wins over everything, and `Pending`/`Failed` are only recorded
/// over ranges that are not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMap {
    level: BucketLevel,
    loaded: IntervalSet,
    pending: IntervalSet,
    failed: IntervalSet,
}

impl CoverageMap {
    #[must_use]
    pub fn new(level: BucketLevel) -> Self {
        Self {
            level,
            loaded: IntervalSet::new(),
            pending: IntervalSet::new(),
            failed: IntervalSet::new(),
        }
    }

    /// Rebuilds a map from previously loaded ranges.
    #[must_use]
    pub fn from_loaded(level: BucketLevel, loaded: impl IntoIterator<Item = TimeRange>) -> Self {
        Self {
            level,
            loaded: IntervalSet::from_ranges(loaded),
            pending: IntervalSet::new(),
            failed: IntervalSet::new(),
        }
    }

    #[must_use]
    pub fn level(&self) -> BucketLevel {
        self.level
    }

    #[must_use]
    pub fn loaded(&self) -> &IntervalSet {
        &self.loaded
    }

    #[must_use]
    pub fn pending(&self) -> &IntervalSet {
        &self.pending
    }

    #[must_use]
    pub fn failed(&self) -> &IntervalSet {
        &self.failed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.pending.is_empty() && self.failed.is_empty()
    }

    /// Sub-ranges of `range` without loaded data.
    #[must_use]
    pub fn query(&self, range: TimeRange) -> Vec<TimeRange> {
        self.loaded.gaps(range)
    }

    /// Sub-ranges of `range` that are neither loaded nor currently being fetched.
    #[must_use]
    pub fn unrequested_gaps(&self, range: TimeRange) -> Vec<TimeRange> {
        self.loaded
            .gaps(range)
            .into_iter()
            .flat_map(|gap| self.pending.gaps(gap))
            .collect()
    }

    pub fn mark_pending(&mut self, range: TimeRange) {
        for piece in self.loaded.gaps(range) {
            self.failed.remove(piece);
            self.pending.insert(piece);
        }
    }

    pub fn mark_loaded(&mut self, range: TimeRange) {
        self.pending.remove(range);
        self.failed.remove(range);
        self.loaded.insert(range);
    }

    pub fn mark_failed(&mut self, range: TimeRange) {
        self.pending.remove(range);
        for piece in self.loaded.gaps(range) {
            self.failed.insert(piece);
        }
    }

    /// Forgets an in-flight marker without recording an outcome.
    pub fn clear_pending(&mut self, range: TimeRange) {
        self.pending.remove(range);
    }

    /// Fraction of `range` covered by loaded data. An empty range counts as covered.
    #[must_use]
    pub fn coverage_ratio(&self, range: TimeRange) -> f64 {
        if range.is_empty() {
            return 1.0;
        }
        self.loaded.covered_ms(range) as f64 / range.len_ms() as f64
    }

    /// Every interval in ascending `from_ms` order, tagged with its state.
    #[must_use]
    pub fn intervals(&self) -> Vec<CoverageInterval> {
        let mut out: Vec<CoverageInterval> = self
            .tagged(&self.loaded, CoverageState::Loaded)
            .chain(self.tagged(&self.pending, CoverageState::Pending))
            .chain(self.tagged(&self.failed, CoverageState::Failed))
            .collect();
        out.sort_unstable_by_key(|interval| interval.range.from_ms());
        out
    }

    /// Intervals clipped to `range`, in ascending order.
    #[must_use]
    pub fn intervals_in(&self, range: TimeRange) -> Vec<CoverageInterval> {
        let level = self.level;
        let clip = |set: &IntervalSet, state| {
            set.clipped(range)
                .map(move |range| CoverageInterval {
                    range,
                    level,
                    state,
                })
                .collect::<Vec<_>>()
        };
        let mut out = clip(&self.loaded, CoverageState::Loaded);
        out.extend(clip(&self.pending, CoverageState::Pending));
        out.extend(clip(&self.failed, CoverageState::Failed));
        out.sort_unstable_by_key(|interval| interval.range.from_ms());
        out
    }

    fn tagged<'a>(
        &'a self,
        set: &'a IntervalSet,
        state: CoverageState,
    ) -> impl Iterator<Item = CoverageInterval> + 'a {
        set.iter().map(move |range| CoverageInterval {
            range,
            level: self.level,
            state,
        })
    }
}

/// Coverage for every `(field, level)` the loader has touched.
///
/// Entries live in an insertion-ordered map so series can be addressed by key
/// or walked densely by index.
#[derive(Debug, Clone, Default)]
pub struct CoverageStore {
    series: IndexMap<SeriesKey, CoverageMap>,
}

impl CoverageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &SeriesKey) -> Option<&CoverageMap> {
        self.series.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &SeriesKey) -> bool {
        self.series.contains_key(key)
    }

    pub fn entry(&mut self, key: SeriesKey) -> &mut CoverageMap {
        let level = key.level;
        self.series
            .entry(key)
            .or_insert_with(|| CoverageMap::new(level))
    }

    pub fn insert(&mut self, key: SeriesKey, map: CoverageMap) {
        self.series.insert(key, map);
    }

    /// Drops every level recorded for `field`.
    pub fn remove_field(&mut self, field: &Field) -> usize {
        let before = self.series.len();
        self.series.retain(|key, _| &key.field != field);
        before - self.series.len()
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &CoverageMap)> {
        self.series.iter()
    }

    /// Gaps of `range` for a series, treating an untouched series as empty.
    #[must_use]
    pub fn query(&self, key: &SeriesKey, range: TimeRange) -> Vec<TimeRange> {
        match self.series.get(key) {
            Some(map) => map.query(range),
            None if range.is_empty() => Vec::new(),
            None => vec![range],
        }
    }

    #[must_use]
    pub fn coverage_ratio(&self, key: &SeriesKey, range: TimeRange) -> f64 {
        match self.series.get(key) {
            Some(map) => map.coverage_ratio(range),
            None if range.is_empty() => 1.0,
            None => 0.0,
        }
    }
}
