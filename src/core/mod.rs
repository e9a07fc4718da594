pub mod bin_store;
pub mod bucketing;
pub mod coverage;
pub mod interval_set;
pub mod types;
pub mod windowing;

pub use bin_store::BinStore;
pub use bucketing::{BucketingConfig, choose_bucket, ideal_bucket_ms};
pub use coverage::{CoverageInterval, CoverageMap, CoverageState, CoverageStore, SeriesKey};
pub use interval_set::IntervalSet;
pub use types::{Bin, BucketLevel, Field, Tile, TimeRange, ViewportRequest};
