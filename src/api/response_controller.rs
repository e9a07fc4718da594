use tracing::{trace, warn};

use crate::cache::{PERSISTED_FORMAT_VERSION, PersistedSeries};
use crate::core::{SeriesKey, Tile};
use crate::extensions::LoaderEvent;
use crate::source::DataSource;

use super::TileLoader;
use super::request_manager::{ApplyReport, TileOutcome};

impl<S: DataSource> TileLoader<S> {
    /// Waits for the next fetch to land and applies it.
    ///
    /// Free in-flight slots are refilled from the queue first, so queued
    /// work keeps moving even when the last completion was stale. Returns
    /// `None` once nothing is in flight or queued.
    pub async fn poll_next(&mut self) -> Option<ApplyReport> {
        let refilled = self.requests.refill(&mut self.coverage);
        if !refilled.is_empty() {
            self.emit_event(LoaderEvent::TilesDispatched {
                count: refilled.len(),
            });
        }

        let completion = self.requests.next_completion().await?;
        let report = self
            .requests
            .apply(completion, &mut self.coverage, &mut self.bins);

        match &report.outcome {
            TileOutcome::Loaded { bins } => {
                self.persist_series(&report.tile);
                self.emit_event(LoaderEvent::TileLoaded {
                    field: report.tile.field.clone(),
                    range: report.tile.range,
                    bins: *bins,
                    stale: report.stale,
                });
            }
            TileOutcome::Failed { error, retryable } => {
                self.emit_event(LoaderEvent::TileFailed {
                    field: report.tile.field.clone(),
                    range: report.tile.range,
                    error: error.to_string(),
                    retryable: *retryable,
                });
            }
            TileOutcome::Discarded => {}
        }
        if !report.dispatched.is_empty() {
            self.emit_event(LoaderEvent::TilesDispatched {
                count: report.dispatched.len(),
            });
        }
        Some(report)
    }

    /// Applies completions until no work is left and returns their reports in order.
    pub async fn run_until_idle(&mut self) -> Vec<ApplyReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.poll_next().await {
            reports.push(report);
        }
        trace!(applied = reports.len(), "loader idle");
        reports
    }

    fn persist_series(&mut self, tile: &Tile) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let key = SeriesKey::new(tile.field.clone(), tile.level);
        let Some(map) = self.coverage.get(&key) else {
            return;
        };
        let series = PersistedSeries {
            format_version: PERSISTED_FORMAT_VERSION,
            context: self.fields.get(&tile.field).copied().unwrap_or_default(),
            loaded: map.loaded().iter().collect(),
            bins: self.bins.bins(&key).to_vec(),
        };
        if let Err(err) = cache.put(&tile.field, tile.level, series) {
            warn!(
                field = %tile.field,
                level_ms = tile.level.as_ms(),
                error = %err,
                "failed to persist series"
            );
        }
    }
}
