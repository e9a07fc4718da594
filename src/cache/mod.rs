//! Persisted coverage capability, used to survive reloads.

mod json_file;

pub use json_file::JsonFileCoverageCache;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Bin, BucketLevel, Field, SeriesKey, TimeRange};
use crate::error::LoaderResult;

/// Layout version of [`PersistedSeries`]; entries with another version are ignored.
pub const PERSISTED_FORMAT_VERSION: u32 = 1;

/// Loaded coverage and bins of one `(field, level)` series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSeries {
    pub format_version: u32,
    /// Query-context generation the data was fetched under.
    pub context: u64,
    pub loaded: Vec<TimeRange>,
    pub bins: Vec<Bin>,
}

impl PersistedSeries {
    /// Returns `true` when the entry was written by this layout and query context.
    #[must_use]
    pub fn is_current(&self, context: u64) -> bool {
        self.format_version == PERSISTED_FORMAT_VERSION && self.context == context
    }
}

/// Durable get/put store for series coverage.
pub trait CoverageCache: Send {
    fn get(&self, field: &Field, level: BucketLevel) -> Option<PersistedSeries>;
    fn put(&mut self, field: &Field, level: BucketLevel, series: PersistedSeries) -> LoaderResult<()>;
}

/// Process-local cache, mostly useful for tests and short-lived hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryCoverageCache {
    entries: HashMap<SeriesKey, PersistedSeries>,
}

impl MemoryCoverageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CoverageCache for MemoryCoverageCache {
    fn get(&self, field: &Field, level: BucketLevel) -> Option<PersistedSeries> {
        self.entries
            .get(&SeriesKey::new(field.clone(), level))
            .cloned()
    }

    fn put(&mut self, field: &Field, level: BucketLevel, series: PersistedSeries) -> LoaderResult<()> {
        self.entries
            .insert(SeriesKey::new(field.clone(), level), series);
        Ok(())
    }
}
