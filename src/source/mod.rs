//! Data-fetch capability consumed by the loader.

mod memory;

pub use memory::{AggregatingSource, FetchCall};

use async_trait::async_trait;

use crate::core::{Bin, BucketLevel, Field, TimeRange};
use crate::error::FetchError;

/// Remote (or local) provider of aggregated bins.
///
/// Implementations return the bins of `field` aggregated at `level` whose
/// timestamps fall inside `range`, sorted by time. An empty vector means the
/// range holds no data, which the loader records as loaded.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    async fn fetch_bins(
        &self,
        field: &Field,
        level: BucketLevel,
        range: TimeRange,
    ) -> Result<Vec<Bin>, FetchError>;
}
