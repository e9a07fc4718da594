use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::BucketLevel;
use crate::error::{LoaderError, LoaderResult};

/// Widest bucket that still fits the signed millisecond time axis.
const MAX_LEVEL_MS: u64 = i64::MAX as u64;

/// Level-of-detail ladder used to pick an aggregation bucket for a viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketingConfig {
    #[serde(default = "default_target_points_per_px")]
    pub target_points_per_px: f64,
    #[serde(default = "default_min_target_points")]
    pub min_target_points: u64,
    #[serde(default = "default_enable_weekly_multiples")]
    pub enable_weekly_multiples: bool,
    #[serde(default = "default_max_weeks_multiple")]
    pub max_weeks_multiple: u64,
    /// Ascending "nice" bucket widths in seconds.
    #[serde(default = "default_nice_seconds")]
    pub nice_seconds: Vec<u64>,
}

impl Default for BucketingConfig {
    fn default() -> Self {
        Self {
            target_points_per_px: default_target_points_per_px(),
            min_target_points: default_min_target_points(),
            enable_weekly_multiples: default_enable_weekly_multiples(),
            max_weeks_multiple: default_max_weeks_multiple(),
            nice_seconds: default_nice_seconds(),
        }
    }
}

impl BucketingConfig {
    pub fn validate(&self) -> LoaderResult<()> {
        if !self.target_points_per_px.is_finite() || self.target_points_per_px <= 0.0 {
            return Err(LoaderError::InvalidConfig(
                "target_points_per_px must be finite and > 0".to_owned(),
            ));
        }
        if self.nice_seconds.is_empty() {
            return Err(LoaderError::InvalidConfig(
                "nice_seconds must not be empty".to_owned(),
            ));
        }
        if self.nice_seconds[0] == 0 {
            return Err(LoaderError::InvalidConfig(
                "nice_seconds entries must be > 0".to_owned(),
            ));
        }
        if self.nice_seconds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(LoaderError::InvalidConfig(
                "nice_seconds must be strictly ascending".to_owned(),
            ));
        }
        if self.nice_seconds.iter().any(|seconds| *seconds > MAX_LEVEL_MS / 1_000) {
            return Err(LoaderError::InvalidConfig(format!(
                "nice_seconds entries must be <= {}",
                MAX_LEVEL_MS / 1_000
            )));
        }
        if self.enable_weekly_multiples {
            let max_weeks = MAX_LEVEL_MS / BucketLevel::WEEK.as_ms();
            if !(1..=max_weeks).contains(&self.max_weeks_multiple) {
                return Err(LoaderError::InvalidConfig(format!(
                    "max_weeks_multiple must be within 1..={max_weeks} when weekly multiples are enabled"
                )));
            }
        }
        Ok(())
    }

    fn ladder_ms(&self) -> impl DoubleEndedIterator<Item = u64> + '_ {
        self.nice_seconds
            .iter()
            .map(|seconds| seconds.saturating_mul(1_000))
    }

    fn ladder_max_ms(&self) -> u64 {
        self.nice_seconds
            .last()
            .map_or(1_000, |seconds| seconds.saturating_mul(1_000))
    }

    /// Largest ladder (or weekly) step strictly finer than `level_ms`, if any.
    fn finer_step_ms(&self, level_ms: u64) -> Option<u64> {
        let ladder_max = self.ladder_max_ms();
        if level_ms > ladder_max {
            let week = BucketLevel::WEEK.as_ms();
            let weeks = level_ms / week;
            let coarser_than_ladder = weeks.saturating_sub(1).saturating_mul(week);
            if coarser_than_ladder > ladder_max {
                return Some(coarser_than_ladder);
            }
            return Some(ladder_max);
        }
        self.ladder_ms().rev().find(|step| *step < level_ms)
    }
}

fn default_target_points_per_px() -> f64 {
    1.0
}

fn default_min_target_points() -> u64 {
    10
}

fn default_enable_weekly_multiples() -> bool {
    true
}

fn default_max_weeks_multiple() -> u64 {
    52
}

fn default_nice_seconds() -> Vec<u64> {
    vec![
        1, 2, 5, 10, 15, 30, 60, 120, 300, 600, 900, 1_800, 3_600, 7_200, 10_800, 21_600, 43_200,
        86_400,
    ]
}

/// Unsnapped bucket width that would place `target_points_per_px` points on each pixel.
#[must_use]
pub fn ideal_bucket_ms(visible_duration_ms: u64, pixel_width: u32, target_points_per_px: f64) -> f64 {
    visible_duration_ms as f64 / (f64::from(pixel_width) * target_points_per_px)
}

/// Picks the aggregation level for a viewport.
///
/// The ideal width is snapped up to the ladder so the point count stays
/// bounded, extended with whole weeks past the ladder when enabled, and
/// stepped one rung finer when fewer than `min_target_points` buckets would
/// cover the visible duration. Identical inputs always give identical levels.
pub fn choose_bucket(
    visible_duration_ms: u64,
    pixel_width: u32,
    config: &BucketingConfig,
) -> LoaderResult<BucketLevel> {
    if pixel_width == 0 {
        return Err(LoaderError::InvalidViewport { pixel_width });
    }
    config.validate()?;

    let ideal = ideal_bucket_ms(visible_duration_ms, pixel_width, config.target_points_per_px);
    let ladder_max = config.ladder_max_ms();

    let snapped = match config.ladder_ms().find(|step| *step as f64 >= ideal) {
        Some(step) => step,
        None if config.enable_weekly_multiples => {
            let week = BucketLevel::WEEK.as_ms();
            let weeks = (ideal / week as f64).ceil() as u64;
            let weeks = weeks.clamp(1, config.max_weeks_multiple);
            weeks.saturating_mul(week).max(ladder_max)
        }
        None => ladder_max,
    };

    let mut level_ms = snapped;
    if visible_duration_ms / level_ms < config.min_target_points {
        if let Some(finer) = config.finer_step_ms(level_ms) {
            level_ms = finer;
        }
    }

    trace!(
        visible_duration_ms,
        pixel_width,
        ideal_ms = ideal,
        snapped_ms = snapped,
        level_ms,
        "choose bucket"
    );
    BucketLevel::new(level_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finer_step_walks_weeks_down_to_ladder_max() {
        let config = BucketingConfig::default();
        let week = BucketLevel::WEEK.as_ms();
        assert_eq!(config.finer_step_ms(3 * week), Some(2 * week));
        assert_eq!(config.finer_step_ms(week), Some(86_400_000));
        assert_eq!(config.finer_step_ms(60_000), Some(30_000));
        assert_eq!(config.finer_step_ms(1_000), None);
    }

    #[test]
    fn validate_rejects_unsorted_ladder() {
        let config = BucketingConfig {
            nice_seconds: vec![1, 5, 2],
            ..BucketingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LoaderError::InvalidConfig(_))
        ));
    }
}
