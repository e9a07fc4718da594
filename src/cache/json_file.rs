use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{BucketLevel, Field, SeriesKey};
use crate::error::{LoaderError, LoaderResult};

use super::{CoverageCache, PersistedSeries};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    entries: Vec<CacheEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    field: Field,
    level: BucketLevel,
    series: PersistedSeries,
}

/// Coverage cache backed by a single JSON document on disk.
///
/// The whole document is rewritten on every `put`.
#[derive(Debug)]
pub struct JsonFileCoverageCache {
    path: PathBuf,
    entries: IndexMap<SeriesKey, PersistedSeries>,
}

impl JsonFileCoverageCache {
    /// Opens the document at `path`. A missing file starts an empty cache;
    /// an unreadable document is discarded with a warning.
    pub fn open(path: impl AsRef<Path>) -> LoaderResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<CacheDocument>(&bytes) {
                Ok(document) => document
                    .entries
                    .into_iter()
                    .map(|entry| (SeriesKey::new(entry.field, entry.level), entry.series))
                    .collect(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "discarding unreadable coverage cache");
                    IndexMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => IndexMap::new(),
            Err(err) => {
                return Err(LoaderError::Cache(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "opened coverage cache");
        Ok(Self { path, entries })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> LoaderResult<()> {
        let document = CacheDocument {
            entries: self
                .entries
                .iter()
                .map(|(key, series)| CacheEntry {
                    field: key.field.clone(),
                    level: key.level,
                    series: series.clone(),
                })
                .collect(),
        };
        let bytes = serde_json::to_vec(&document)
            .map_err(|err| LoaderError::Cache(format!("failed to encode cache: {err}")))?;
        fs::write(&self.path, bytes).map_err(|err| {
            LoaderError::Cache(format!("failed to write {}: {err}", self.path.display()))
        })
    }
}

impl CoverageCache for JsonFileCoverageCache {
    fn get(&self, field: &Field, level: BucketLevel) -> Option<PersistedSeries> {
        self.entries
            .get(&SeriesKey::new(field.clone(), level))
            .cloned()
    }

    fn put(&mut self, field: &Field, level: BucketLevel, series: PersistedSeries) -> LoaderResult<()> {
        self.entries
            .insert(SeriesKey::new(field.clone(), level), series);
        self.flush()
    }
}
