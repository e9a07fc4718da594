use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::cache::CoverageCache;
use crate::core::{BinStore, CoverageStore};
use crate::error::LoaderResult;
use crate::source::DataSource;

use super::request_manager::RequestManager;
use super::{LoaderConfig, TileLoader};

impl<S: DataSource> TileLoader<S> {
    /// Creates a loader over `source` with a validated configuration.
    pub fn new(source: Arc<S>, config: LoaderConfig) -> LoaderResult<Self> {
        config.validate()?;
        debug!(
            max_in_flight = config.max_in_flight,
            pan_prefetch_ratio = config.pan_prefetch_ratio,
            max_bins_per_tile = config.max_bins_per_tile,
            "init tile loader"
        );
        let requests = RequestManager::new(source, config.max_in_flight);
        Ok(Self {
            config,
            fields: IndexMap::new(),
            coverage: CoverageStore::new(),
            bins: BinStore::new(),
            requests,
            viewport: None,
            level: None,
            field_levels: HashMap::new(),
            cache: None,
            hydrated: HashSet::new(),
            observers: Vec::new(),
        })
    }

    /// Attaches a persisted coverage cache. Series are hydrated from it the
    /// first time a cycle touches them and written back after every load.
    #[must_use]
    pub fn with_cache(mut self, cache: Box<dyn CoverageCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}
