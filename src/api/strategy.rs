use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{BucketLevel, CoverageMap, Field, IntervalSet, Tile, TimeRange};

use super::transition::{PanDirection, Transition};

/// Inputs shared by every strategy when turning gaps into tiles.
#[derive(Debug, Clone, Copy)]
pub struct TileParams<'a> {
    pub field: &'a Field,
    pub level: BucketLevel,
    pub visible_range: TimeRange,
    pub pan_prefetch_ratio: f64,
    pub max_bins_per_tile: u64,
    pub align_tiles_to_buckets: bool,
}

/// Fetch policy selected from a [`Transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingStrategy {
    /// Request every unrequested gap of the visible range.
    Full,
    /// Request the edge exposed by a pan plus a prefetch margin ahead of it.
    /// The interior is only revisited for holes nothing is fetching, such as
    /// queued work cancelled by the pan itself.
    Pan {
        previous_range: TimeRange,
        direction: PanDirection,
    },
}

impl LoadingStrategy {
    #[must_use]
    pub fn for_transition(transition: Transition, previous_range: Option<TimeRange>) -> Self {
        match (transition, previous_range) {
            (Transition::Pan { direction, .. }, Some(previous_range)) => Self::Pan {
                previous_range,
                direction,
            },
            _ => Self::Full,
        }
    }

    /// Returns `false` when the visible range is already fully loaded at the target level.
    #[must_use]
    pub fn should_load(&self, coverage: Option<&CoverageMap>, visible_range: TimeRange) -> bool {
        coverage.is_none_or(|map| map.coverage_ratio(visible_range) < 1.0)
    }

    /// Tiles needed for this cycle, in strategy order (see [`prioritize_tiles`]).
    #[must_use]
    pub fn determine_tiles(&self, params: &TileParams<'_>, coverage: Option<&CoverageMap>) -> Vec<Tile> {
        let wanted: Vec<TimeRange> = match *self {
            Self::Full => vec![params.visible_range],
            Self::Pan {
                previous_range,
                direction,
            } => {
                let mut wanted = exposed_edges(previous_range, params, direction);
                wanted.extend(params.visible_range.intersect(previous_range));
                IntervalSet::from_ranges(wanted).iter().collect()
            }
        };

        let gaps = wanted.into_iter().flat_map(|range| match coverage {
            Some(map) => map.unrequested_gaps(range),
            None if range.is_empty() => Vec::new(),
            None => vec![range],
        });

        let mut tiles = Vec::new();
        for gap in gaps {
            let gap = if params.align_tiles_to_buckets {
                gap.align_outward(params.level)
            } else {
                gap
            };
            let max_span = params
                .max_bins_per_tile
                .saturating_mul(params.level.as_ms());
            for piece in split_range(gap, max_span) {
                tiles.push(Tile::new(params.field.clone(), params.level, piece));
            }
        }
        trace!(
            field = %params.field,
            level_ms = params.level.as_ms(),
            strategy = ?self,
            tiles = tiles.len(),
            "determined tiles"
        );
        tiles
    }

    /// Orders tiles nearest-to-center first; see [`prioritize_tiles`].
    #[must_use]
    pub fn prioritize_tiles(&self, tiles: Vec<Tile>, visible_range: TimeRange) -> Vec<Tile> {
        prioritize_tiles(tiles, visible_range)
    }
}

/// Stamps each tile with its distance from the visible center and sorts by
/// `(priority, from_ms)`. The sort is stable, so tiles tied on both keep
/// their incoming order.
#[must_use]
pub fn prioritize_tiles(tiles: Vec<Tile>, visible_range: TimeRange) -> Vec<Tile> {
    let center = visible_range.center_ms();
    let mut tiles: Vec<Tile> = tiles
        .into_iter()
        .map(|tile| {
            let priority = tile.range.distance_to(center);
            tile.with_priority(priority)
        })
        .collect();
    tiles.sort_by_key(|tile| (tile.priority, tile.range.from_ms()));
    tiles
}

/// Newly exposed part of the visible range, stretched by the prefetch margin
/// in the pan direction.
fn exposed_edges(
    previous_range: TimeRange,
    params: &TileParams<'_>,
    direction: PanDirection,
) -> Vec<TimeRange> {
    let visible = params.visible_range;
    let margin = (visible.len_ms() as f64 * params.pan_prefetch_ratio).ceil() as i64;

    visible
        .difference(previous_range)
        .into_iter()
        .map(|edge| match direction {
            PanDirection::Forward if edge.to_ms() == visible.to_ms() => {
                TimeRange::spanning(edge.from_ms(), edge.to_ms().saturating_add(margin))
            }
            PanDirection::Backward if edge.from_ms() == visible.from_ms() => {
                TimeRange::spanning(edge.from_ms().saturating_sub(margin), edge.to_ms())
            }
            _ => edge,
        })
        .collect()
}

/// Cuts `range` into consecutive pieces no longer than `max_span_ms`.
fn split_range(range: TimeRange, max_span_ms: u64) -> Vec<TimeRange> {
    if range.is_empty() {
        return Vec::new();
    }
    let step = i64::try_from(max_span_ms.max(1)).unwrap_or(i64::MAX);
    let mut pieces = Vec::new();
    let mut from_ms = range.from_ms();
    while from_ms < range.to_ms() {
        let to_ms = from_ms.saturating_add(step).min(range.to_ms());
        pieces.push(TimeRange::spanning(from_ms, to_ms));
        from_ms = to_ms;
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(from_ms: i64, to_ms: i64) -> TimeRange {
        TimeRange::new(from_ms, to_ms).expect("valid range")
    }

    #[test]
    fn split_range_keeps_remainder_piece() {
        let pieces = split_range(range(0, 25), 10);
        assert_eq!(pieces, vec![range(0, 10), range(10, 20), range(20, 25)]);
    }

    #[test]
    fn exposed_edges_extends_only_in_pan_direction() {
        let field = Field::new("a", "b");
        let params = TileParams {
            field: &field,
            level: BucketLevel::new(1).expect("level"),
            visible_range: range(50, 150),
            pan_prefetch_ratio: 0.5,
            max_bins_per_tile: 1_000,
            align_tiles_to_buckets: false,
        };
        let edges = exposed_edges(range(0, 100), &params, PanDirection::Forward);
        assert_eq!(edges, vec![range(100, 200)]);

        let params = TileParams {
            visible_range: range(0, 100),
            ..params
        };
        let edges = exposed_edges(range(50, 150), &params, PanDirection::Backward);
        assert_eq!(edges, vec![range(-50, 50)]);
    }
}
