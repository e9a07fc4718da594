use serde::{Deserialize, Serialize};

use crate::core::{BinStore, CoverageMap, SeriesKey, TimeRange};

use super::engine_config::QualityThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Good,
    Medium,
    Poor,
}

/// Coverage read model for one field over the visible range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    /// Loaded fraction of the visible range, in `[0, 1]`.
    pub coverage: f64,
    /// Visible bins per pixel.
    pub density: f64,
    /// Disjoint unloaded sub-ranges inside the visible range.
    pub gaps: usize,
    pub quality: Quality,
    pub visible_points: usize,
    pub pending_intervals: usize,
    pub failed_intervals: usize,
}

#[must_use]
pub fn classify_quality(coverage: f64, gaps: usize, thresholds: QualityThresholds) -> Quality {
    if coverage >= thresholds.good_coverage && gaps == 0 {
        Quality::Good
    } else if coverage < thresholds.poor_coverage || gaps > thresholds.max_gaps_before_poor {
        Quality::Poor
    } else {
        Quality::Medium
    }
}

/// Projects coverage, density and quality for `key` over `visible_range`.
///
/// A series with no coverage map yet counts as entirely unloaded.
#[must_use]
pub fn project_stats(
    coverage: Option<&CoverageMap>,
    bins: &BinStore,
    key: &SeriesKey,
    visible_range: TimeRange,
    pixel_width: u32,
    thresholds: QualityThresholds,
) -> CoverageStats {
    let (ratio, gaps, pending_intervals, failed_intervals) = match coverage {
        Some(map) => (
            map.coverage_ratio(visible_range),
            map.query(visible_range).len(),
            map.pending().clipped(visible_range).count(),
            map.failed().clipped(visible_range).count(),
        ),
        None if visible_range.is_empty() => (1.0, 0, 0, 0),
        None => (0.0, 1, 0, 0),
    };

    let visible_points = bins.count_in_range(key, visible_range);
    let density = if pixel_width == 0 {
        0.0
    } else {
        visible_points as f64 / f64::from(pixel_width)
    };

    CoverageStats {
        coverage: ratio,
        density,
        gaps,
        quality: classify_quality(ratio, gaps, thresholds),
        visible_points,
        pending_intervals,
        failed_intervals,
    }
}
