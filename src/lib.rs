//! chart-tiles: coverage-aware tile loading for multi-field time-series charts.
//!
//! The crate decides which aggregated data a chart must fetch after each
//! pan, zoom or resize. It picks a bucket level for the visible range,
//! tracks which time ranges are already loaded per field and level, plans
//! the missing tiles and drives a bounded, deduplicated fetch pipeline
//! against a pluggable [`source::DataSource`].

pub mod api;
pub mod cache;
pub mod core;
pub mod error;
pub mod extensions;
pub mod source;
pub mod telemetry;

pub use api::{LoaderConfig, TileLoader};
pub use error::{FetchError, LoaderError, LoaderResult};
