use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::trace;

use crate::core::{Bin, BucketLevel, Field, TimeRange};
use crate::error::FetchError;

use super::DataSource;

/// One call observed by [`AggregatingSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub field: Field,
    pub level: BucketLevel,
    pub range: TimeRange,
}

/// In-memory source that aggregates raw samples on request.
///
/// Each bin carries `[min, max, mean, count]` for its bucket and is stamped
/// with the bucket start, clamped into the requested range.
#[derive(Debug, Default)]
pub struct AggregatingSource {
    samples: HashMap<Field, Vec<(i64, f64)>>,
    failures: Mutex<HashMap<Field, FetchError>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl AggregatingSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers raw samples for a field. Samples are sorted by time.
    #[must_use]
    pub fn with_samples(mut self, field: Field, mut samples: Vec<(i64, f64)>) -> Self {
        samples.sort_by_key(|(time_ms, _)| *time_ms);
        self.samples.insert(field, samples);
        self
    }

    /// Makes every following fetch for `field` fail with `error`.
    pub fn fail_field(&self, field: Field, error: FetchError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, error);
    }

    pub fn recover_field(&self, field: &Field) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(field);
    }

    /// Calls received so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn aggregate(&self, field: &Field, level: BucketLevel, range: TimeRange) -> Vec<Bin> {
        let Some(samples) = self.samples.get(field) else {
            return Vec::new();
        };
        let start = samples.partition_point(|(time_ms, _)| *time_ms < range.from_ms());
        let end = samples.partition_point(|(time_ms, _)| *time_ms < range.to_ms());
        let step = level.as_ms() as i64;

        let mut bins = Vec::new();
        let mut current: Option<(i64, f64, f64, f64, usize)> = None;
        for &(time_ms, value) in &samples[start..end.max(start)] {
            let bucket = time_ms.div_euclid(step) * step;
            match current.as_mut() {
                Some((open, min, max, sum, count)) if *open == bucket => {
                    *min = min.min(value);
                    *max = max.max(value);
                    *sum += value;
                    *count += 1;
                }
                _ => {
                    if let Some(done) = current.take() {
                        bins.push(finish_bin(done, range));
                    }
                    current = Some((bucket, value, value, value, 1));
                }
            }
        }
        if let Some(done) = current {
            bins.push(finish_bin(done, range));
        }
        bins
    }
}

fn finish_bin((bucket, min, max, sum, count): (i64, f64, f64, f64, usize), range: TimeRange) -> Bin {
    Bin::new(
        bucket.max(range.from_ms()),
        [min, max, sum / count as f64, count as f64],
    )
}

#[async_trait]
impl DataSource for AggregatingSource {
    async fn fetch_bins(
        &self,
        field: &Field,
        level: BucketLevel,
        range: TimeRange,
    ) -> Result<Vec<Bin>, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FetchCall {
                field: field.clone(),
                level,
                range,
            });

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field)
            .cloned();
        if let Some(error) = failure {
            trace!(%field, %range, %error, "scripted fetch failure");
            return Err(error);
        }

        Ok(self.aggregate(field, level, range))
    }
}
