use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{BucketLevel, CoverageMap, Field, SeriesKey, ViewportRequest, choose_bucket};
use crate::error::LoaderResult;
use crate::extensions::LoaderEvent;
use crate::source::DataSource;

use super::TileLoader;
use super::request_manager::{Epoch, SubmitReport};
use super::strategy::{LoadingStrategy, TileParams, prioritize_tiles};
use super::transition::{Transition, classify_transition};

/// Outcome of one viewport evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub epoch: Epoch,
    pub level: BucketLevel,
    /// Transition detected for each active field, in field order.
    pub transitions: Vec<(Field, Transition)>,
    pub submit: SubmitReport,
}

impl CycleSummary {
    #[must_use]
    pub fn transition_of(&self, field: &Field) -> Option<Transition> {
        self.transitions
            .iter()
            .find(|(entry, _)| entry == field)
            .map(|(_, transition)| *transition)
    }
}

impl<S: DataSource> TileLoader<S> {
    /// Runs one evaluation cycle for a new viewport.
    ///
    /// The call never waits on fetches: it picks a bucket level, classifies
    /// the move per field, plans tiles and hands them to the request manager.
    /// Responses are applied through [`TileLoader::poll_next`].
    pub fn request_viewport(&mut self, request: ViewportRequest) -> LoaderResult<CycleSummary> {
        let request = request.validate()?;
        let visible_range = request.visible_range;
        let level = choose_bucket(
            visible_range.len_ms(),
            request.pixel_width,
            &self.config.bucketing,
        )?;

        let previous = self.viewport;
        let epoch = self.requests.begin_cycle();
        self.viewport = Some(request);
        self.level = Some(level);
        debug!(
            epoch,
            level_ms = level.as_ms(),
            from_ms = visible_range.from_ms(),
            to_ms = visible_range.to_ms(),
            pixel_width = request.pixel_width,
            "viewport cycle"
        );
        self.emit_event(LoaderEvent::CycleStarted { epoch, level });

        let fields: Vec<Field> = self.fields.keys().cloned().collect();
        let mut transitions = Vec::with_capacity(fields.len());
        let mut tiles = Vec::new();
        for field in fields {
            let key = SeriesKey::new(field.clone(), level);
            self.hydrate_series(&key);

            let last_level = self.field_levels.insert(field.clone(), level);
            let transition = classify_transition(previous.as_ref(), &request, last_level, level);
            let strategy = LoadingStrategy::for_transition(
                transition,
                previous.map(|viewport| viewport.visible_range),
            );

            let coverage = self.coverage.get(&key);
            if strategy.should_load(coverage, visible_range) {
                let params = TileParams {
                    field: &field,
                    level,
                    visible_range,
                    pan_prefetch_ratio: self.config.pan_prefetch_ratio,
                    max_bins_per_tile: self.config.max_bins_per_tile,
                    align_tiles_to_buckets: self.config.align_tiles_to_buckets,
                };
                tiles.extend(strategy.determine_tiles(&params, coverage));
            } else {
                trace!(%field, level_ms = level.as_ms(), "visible range already loaded");
            }
            debug!(%field, epoch, transition = ?transition, "field transition");
            transitions.push((field, transition));
        }

        let tiles = prioritize_tiles(tiles, visible_range);
        let submit = self.requests.submit(epoch, tiles, &mut self.coverage);
        if !submit.dispatched.is_empty() {
            self.emit_event(LoaderEvent::TilesDispatched {
                count: submit.dispatched.len(),
            });
        }

        Ok(CycleSummary {
            epoch,
            level,
            transitions,
            submit,
        })
    }

    /// Seeds a series from the persisted cache the first time a cycle touches it.
    fn hydrate_series(&mut self, key: &SeriesKey) {
        if !self.hydrated.insert(key.clone()) {
            return;
        }
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if self.coverage.contains(key) {
            return;
        }
        let Some(persisted) = cache.get(&key.field, key.level) else {
            return;
        };

        let context = self.fields.get(&key.field).copied().unwrap_or_default();
        if !persisted.is_current(context) {
            debug!(
                field = %key.field,
                level_ms = key.level.as_ms(),
                format_version = persisted.format_version,
                cached_context = persisted.context,
                context,
                "ignore outdated cache entry"
            );
            return;
        }

        let map = CoverageMap::from_loaded(key.level, persisted.loaded.iter().copied());
        let mut bins = persisted.bins;
        bins.sort_by_key(|bin| bin.time_ms);
        if bins.iter().any(|bin| !map.loaded().iter().any(|range| range.contains_ms(bin.time_ms))) {
            warn!(
                field = %key.field,
                level_ms = key.level.as_ms(),
                "ignore cache entry with bins outside its coverage"
            );
            return;
        }

        debug!(
            field = %key.field,
            level_ms = key.level.as_ms(),
            intervals = map.loaded().len(),
            bins = bins.len(),
            "hydrate series from cache"
        );
        for range in map.loaded().iter() {
            let start = bins.partition_point(|bin| bin.time_ms < range.from_ms());
            let end = bins.partition_point(|bin| bin.time_ms < range.to_ms());
            self.bins
                .replace_range(key.clone(), range, bins[start..end].to_vec());
        }
        self.coverage.insert(key.clone(), map);
    }
}
