use std::collections::HashMap;

use crate::core::windowing::{bins_in_time_window, window_index_span};
use crate::core::{Bin, Field, SeriesKey, TimeRange};

/// Aggregated bins per `(field, level)`, each series kept sorted by time.
#[derive(Debug, Clone, Default)]
pub struct BinStore {
    series: HashMap<SeriesKey, Vec<Bin>>,
}

impl BinStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything stored inside `range` with `bins`.
    ///
    /// `bins` must be time-sorted and inside `range`. Later responses for an
    /// overlapping range overwrite earlier ones.
    pub fn replace_range(&mut self, key: SeriesKey, range: TimeRange, bins: Vec<Bin>) {
        let stored = self.series.entry(key).or_default();
        let (start, end) = window_index_span(stored, range);
        stored.splice(start..end, bins);
    }

    #[must_use]
    pub fn bins(&self, key: &SeriesKey) -> &[Bin] {
        self.series.get(key).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn bins_in_range(&self, key: &SeriesKey, range: TimeRange) -> &[Bin] {
        bins_in_time_window(self.bins(key), range)
    }

    #[must_use]
    pub fn count_in_range(&self, key: &SeriesKey, range: TimeRange) -> usize {
        self.bins_in_range(key, range).len()
    }

    pub fn remove_field(&mut self, field: &Field) {
        self.series.retain(|key, _| &key.field != field);
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    #[must_use]
    pub fn total_bins(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}
