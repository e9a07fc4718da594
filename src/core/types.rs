use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{LoaderError, LoaderResult};

/// Half-open time window `[from_ms, to_ms)` in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange", into = "RawTimeRange")]
pub struct TimeRange {
    from_ms: i64,
    to_ms: i64,
}

#[derive(Serialize, Deserialize)]
struct RawTimeRange {
    from_ms: i64,
    to_ms: i64,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = LoaderError;

    fn try_from(raw: RawTimeRange) -> LoaderResult<Self> {
        Self::new(raw.from_ms, raw.to_ms)
    }
}

impl From<TimeRange> for RawTimeRange {
    fn from(range: TimeRange) -> Self {
        Self {
            from_ms: range.from_ms,
            to_ms: range.to_ms,
        }
    }
}

impl TimeRange {
    pub fn new(from_ms: i64, to_ms: i64) -> LoaderResult<Self> {
        if from_ms > to_ms {
            return Err(LoaderError::InvalidRange { from_ms, to_ms });
        }
        Ok(Self { from_ms, to_ms })
    }

    /// Builds a range from UTC instants, truncated to millisecond precision.
    pub fn from_datetimes(from: DateTime<Utc>, to: DateTime<Utc>) -> LoaderResult<Self> {
        Self::new(from.timestamp_millis(), to.timestamp_millis())
    }

    /// Builds the range between two bounds regardless of their order.
    #[must_use]
    pub(crate) fn spanning(a: i64, b: i64) -> Self {
        Self {
            from_ms: a.min(b),
            to_ms: a.max(b),
        }
    }

    #[must_use]
    pub const fn from_ms(self) -> i64 {
        self.from_ms
    }

    #[must_use]
    pub const fn to_ms(self) -> i64 {
        self.to_ms
    }

    #[must_use]
    pub fn len_ms(self) -> u64 {
        self.to_ms.abs_diff(self.from_ms)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.from_ms == self.to_ms
    }

    #[must_use]
    pub const fn contains_ms(self, time_ms: i64) -> bool {
        time_ms >= self.from_ms && time_ms < self.to_ms
    }

    #[must_use]
    pub const fn contains_range(self, other: Self) -> bool {
        other.from_ms >= self.from_ms && other.to_ms <= self.to_ms
    }

    /// Returns `true` when both ranges share at least one millisecond.
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.from_ms < other.to_ms && other.from_ms < self.to_ms
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let from_ms = self.from_ms.max(other.from_ms);
        let to_ms = self.to_ms.min(other.to_ms);
        (from_ms < to_ms).then_some(Self { from_ms, to_ms })
    }

    /// Midpoint, rounded toward `from_ms`.
    #[must_use]
    pub fn center_ms(self) -> i64 {
        self.from_ms + (self.len_ms() / 2) as i64
    }

    /// Distance from `time_ms` to the nearest point of this range, `0` inside it.
    #[must_use]
    pub fn distance_to(self, time_ms: i64) -> u64 {
        if time_ms < self.from_ms {
            self.from_ms.abs_diff(time_ms)
        } else if time_ms >= self.to_ms {
            // The last covered millisecond is `to_ms - 1`.
            time_ms.abs_diff(self.to_ms.saturating_sub(1))
        } else {
            0
        }
    }

    /// Portions of `self` not covered by `other`, left to right.
    #[must_use]
    pub fn difference(self, other: Self) -> SmallVec<[Self; 2]> {
        let mut out = SmallVec::new();
        if !self.overlaps(other) {
            if !self.is_empty() {
                out.push(self);
            }
            return out;
        }
        if self.from_ms < other.from_ms {
            out.push(Self {
                from_ms: self.from_ms,
                to_ms: other.from_ms,
            });
        }
        if other.to_ms < self.to_ms {
            out.push(Self {
                from_ms: other.to_ms,
                to_ms: self.to_ms,
            });
        }
        out
    }

    /// Grows the range outward to multiples of `level`. Edges that would
    /// leave the `i64` axis stop at its ends.
    #[must_use]
    pub fn align_outward(self, level: BucketLevel) -> Self {
        let step = i64::try_from(level.as_ms()).unwrap_or(i64::MAX);
        let from_ms = self.from_ms.div_euclid(step).saturating_mul(step);
        let to_ms = if self.to_ms.rem_euclid(step) == 0 {
            self.to_ms
        } else {
            (self.to_ms.div_euclid(step) + 1).saturating_mul(step)
        };
        Self { from_ms, to_ms }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from_ms, self.to_ms)
    }
}

/// Aggregation granularity in milliseconds per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct BucketLevel(u64);

impl BucketLevel {
    pub const SECOND: Self = Self(1_000);
    pub const MINUTE: Self = Self(60_000);
    pub const HOUR: Self = Self(3_600_000);
    pub const DAY: Self = Self(86_400_000);
    pub const WEEK: Self = Self(604_800_000);

    pub fn new(ms: u64) -> LoaderResult<Self> {
        if ms == 0 {
            return Err(LoaderError::InvalidConfig(
                "bucket level must be > 0 ms".to_owned(),
            ));
        }
        Ok(Self(ms))
    }

    pub fn from_seconds(seconds: u64) -> LoaderResult<Self> {
        Self::new(seconds.saturating_mul(1_000))
    }

    #[must_use]
    pub const fn as_ms(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for BucketLevel {
    type Error = LoaderError;

    fn try_from(ms: u64) -> LoaderResult<Self> {
        Self::new(ms)
    }
}

impl From<BucketLevel> for u64 {
    fn from(level: BucketLevel) -> Self {
        level.0
    }
}

impl fmt::Display for BucketLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// One time series: an entity and one of its columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    pub entity: String,
    pub column: String,
}

impl Field {
    #[must_use]
    pub fn new(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.column)
    }
}

/// One aggregated sample. Values are opaque to the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub time_ms: i64,
    pub values: SmallVec<[f64; 4]>,
}

impl Bin {
    #[must_use]
    pub fn new(time_ms: i64, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            time_ms,
            values: values.into_iter().collect(),
        }
    }
}

/// One unit of fetch work produced by a loading strategy.
///
/// `priority` is the distance in milliseconds from the visible center; lower
/// values are dispatched first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub field: Field,
    pub level: BucketLevel,
    pub range: TimeRange,
    pub priority: u64,
}

impl Tile {
    #[must_use]
    pub fn new(field: Field, level: BucketLevel, range: TimeRange) -> Self {
        Self {
            field,
            level,
            range,
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u64) -> Self {
        self.priority = priority;
        self
    }
}

/// Input of one evaluation cycle, produced on every pan/zoom/resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportRequest {
    pub visible_range: TimeRange,
    pub pixel_width: u32,
}

impl ViewportRequest {
    #[must_use]
    pub fn new(visible_range: TimeRange, pixel_width: u32) -> Self {
        Self {
            visible_range,
            pixel_width,
        }
    }

    pub fn validate(self) -> LoaderResult<Self> {
        if self.pixel_width == 0 {
            return Err(LoaderError::InvalidViewport {
                pixel_width: self.pixel_width,
            });
        }
        if self.visible_range.is_empty() {
            return Err(LoaderError::InvalidRange {
                from_ms: self.visible_range.from_ms(),
                to_ms: self.visible_range.to_ms(),
            });
        }
        Ok(self)
    }
}
