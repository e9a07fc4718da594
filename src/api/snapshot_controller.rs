use serde::{Deserialize, Serialize};

use crate::core::{Bin, BucketLevel, CoverageInterval, Field, SeriesKey};
use crate::error::{LoaderError, LoaderResult};
use crate::source::DataSource;

use super::TileLoader;
use super::stats::{CoverageStats, project_stats};

/// Read model of one field at the current viewport, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub field: Field,
    pub level: BucketLevel,
    /// Coverage intervals clipped to the visible range, ascending.
    pub coverage: Vec<CoverageInterval>,
    pub stats: CoverageStats,
    /// Bins inside the visible range, ascending.
    pub bins: Vec<Bin>,
}

impl<S: DataSource> TileLoader<S> {
    /// Snapshot of `field` at the current viewport.
    ///
    /// Returns `Ok(None)` before the first viewport cycle.
    pub fn snapshot(&self, field: &Field) -> LoaderResult<Option<FieldSnapshot>> {
        if !self.fields.contains_key(field) {
            return Err(LoaderError::UnknownField(field.to_string()));
        }
        let (Some(viewport), Some(level)) = (self.viewport, self.level) else {
            return Ok(None);
        };
        let visible_range = viewport.visible_range;
        let key = SeriesKey::new(field.clone(), level);
        let map = self.coverage.get(&key);

        Ok(Some(FieldSnapshot {
            field: field.clone(),
            level,
            coverage: map
                .map(|map| map.intervals_in(visible_range))
                .unwrap_or_default(),
            stats: project_stats(
                map,
                &self.bins,
                &key,
                visible_range,
                viewport.pixel_width,
                self.config.quality,
            ),
            bins: self.bins.bins_in_range(&key, visible_range).to_vec(),
        }))
    }

    /// Coverage stats of `field` at the current viewport.
    pub fn stats(&self, field: &Field) -> LoaderResult<Option<CoverageStats>> {
        Ok(self.snapshot(field)?.map(|snapshot| snapshot.stats))
    }

    /// Snapshots of every active field, in field order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<FieldSnapshot> {
        self.fields
            .keys()
            .filter_map(|field| self.snapshot(field).ok().flatten())
            .collect()
    }
}
