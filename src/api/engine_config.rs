use serde::{Deserialize, Serialize};

use crate::core::BucketingConfig;
use crate::error::{LoaderError, LoaderResult};

/// Policy constants for the qualitative coverage label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum coverage (with zero gaps) for `good`.
    pub good_coverage: f64,
    /// Coverage below this is `poor`.
    pub poor_coverage: f64,
    /// More gaps than this is `poor`.
    pub max_gaps_before_poor: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            good_coverage: 0.98,
            poor_coverage: 0.5,
            max_gaps_before_poor: 3,
        }
    }
}

impl QualityThresholds {
    fn validate(self) -> LoaderResult<Self> {
        let in_unit = |value: f64| value.is_finite() && (0.0..=1.0).contains(&value);
        if !in_unit(self.good_coverage) || !in_unit(self.poor_coverage) {
            return Err(LoaderError::InvalidConfig(
                "quality coverage thresholds must be within [0, 1]".to_owned(),
            ));
        }
        if self.poor_coverage > self.good_coverage {
            return Err(LoaderError::InvalidConfig(
                "poor_coverage must be <= good_coverage".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Loader bootstrap configuration.
///
/// This type is serializable so hosts can keep it next to their chart setup.
/// It is fixed once a loader is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub bucketing: BucketingConfig,
    /// Fetches allowed in flight at once, shared by all fields.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Extra span fetched past the exposed edge of a pan, as a fraction of the visible span.
    #[serde(default = "default_pan_prefetch_ratio")]
    pub pan_prefetch_ratio: f64,
    /// Upper bound on buckets per tile; wider gaps are split.
    #[serde(default = "default_max_bins_per_tile")]
    pub max_bins_per_tile: u64,
    /// Snap tile edges outward to bucket boundaries.
    #[serde(default = "default_align_tiles_to_buckets")]
    pub align_tiles_to_buckets: bool,
    #[serde(default)]
    pub quality: QualityThresholds,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bucketing: BucketingConfig::default(),
            max_in_flight: default_max_in_flight(),
            pan_prefetch_ratio: default_pan_prefetch_ratio(),
            max_bins_per_tile: default_max_bins_per_tile(),
            align_tiles_to_buckets: default_align_tiles_to_buckets(),
            quality: QualityThresholds::default(),
        }
    }
}

impl LoaderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bucketing(mut self, bucketing: BucketingConfig) -> Self {
        self.bucketing = bucketing;
        self
    }

    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    #[must_use]
    pub fn with_pan_prefetch_ratio(mut self, ratio: f64) -> Self {
        self.pan_prefetch_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_max_bins_per_tile(mut self, max_bins_per_tile: u64) -> Self {
        self.max_bins_per_tile = max_bins_per_tile;
        self
    }

    #[must_use]
    pub fn with_align_tiles_to_buckets(mut self, align: bool) -> Self {
        self.align_tiles_to_buckets = align;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: QualityThresholds) -> Self {
        self.quality = quality;
        self
    }

    pub fn validate(&self) -> LoaderResult<()> {
        self.bucketing.validate()?;
        self.quality.validate()?;
        if self.max_in_flight == 0 {
            return Err(LoaderError::InvalidConfig(
                "max_in_flight must be >= 1".to_owned(),
            ));
        }
        if !self.pan_prefetch_ratio.is_finite() || self.pan_prefetch_ratio < 0.0 {
            return Err(LoaderError::InvalidConfig(
                "pan_prefetch_ratio must be finite and >= 0".to_owned(),
            ));
        }
        if self.max_bins_per_tile == 0 {
            return Err(LoaderError::InvalidConfig(
                "max_bins_per_tile must be >= 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(input: &str) -> LoaderResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|err| LoaderError::InvalidConfig(format!("failed to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> LoaderResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| LoaderError::InvalidConfig(format!("failed to encode config: {err}")))
    }
}

fn default_max_in_flight() -> usize {
    4
}

fn default_pan_prefetch_ratio() -> f64 {
    0.25
}

fn default_max_bins_per_tile() -> u64 {
    2_000
}

fn default_align_tiles_to_buckets() -> bool {
    true
}
