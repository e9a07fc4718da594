use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::cache::CoverageCache;
use crate::core::{BinStore, BucketLevel, CoverageStore, Field, SeriesKey, ViewportRequest};
use crate::extensions::LoaderObserver;
use crate::source::DataSource;

use super::LoaderConfig;
use super::request_manager::{Epoch, RequestManager};

/// Coverage-aware tile loader for one chart instance.
///
/// `TileLoader` ties bucket selection, transition detection, loading
/// strategies and the request manager together. Viewport evaluation and
/// response application are synchronous; only fetches suspend.
pub struct TileLoader<S: DataSource> {
    pub(super) config: LoaderConfig,
    /// Active fields and the query context each was loaded under.
    pub(super) fields: IndexMap<Field, u64>,
    pub(super) coverage: CoverageStore,
    pub(super) bins: BinStore,
    pub(super) requests: RequestManager<S>,
    pub(super) viewport: Option<ViewportRequest>,
    pub(super) level: Option<BucketLevel>,
    pub(super) field_levels: HashMap<Field, BucketLevel>,
    pub(super) cache: Option<Box<dyn CoverageCache>>,
    pub(super) hydrated: HashSet<SeriesKey>,
    pub(super) observers: Vec<Box<dyn LoaderObserver>>,
}

impl<S: DataSource> TileLoader<S> {
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    #[must_use]
    pub fn coverage(&self) -> &CoverageStore {
        &self.coverage
    }

    #[must_use]
    pub fn bins(&self) -> &BinStore {
        &self.bins
    }

    #[must_use]
    pub fn source(&self) -> &S {
        self.requests.source()
    }

    /// Viewport of the most recent cycle.
    #[must_use]
    pub fn viewport(&self) -> Option<ViewportRequest> {
        self.viewport
    }

    /// Level chosen by the most recent cycle.
    #[must_use]
    pub fn current_level(&self) -> Option<BucketLevel> {
        self.level
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        self.requests.current_epoch()
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.requests.in_flight_len()
    }

    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.requests.queued_len()
    }

    #[must_use]
    pub fn requests(&self) -> &RequestManager<S> {
        &self.requests
    }

    #[must_use]
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }
}
