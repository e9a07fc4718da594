use chart_tiles::api::{LoadingStrategy, PanDirection, TileParams, prioritize_tiles};
use chart_tiles::core::{BucketLevel, CoverageMap, Field, Tile, TimeRange};

fn range(from_ms: i64, to_ms: i64) -> TimeRange {
    TimeRange::new(from_ms, to_ms).expect("valid range")
}

fn level(ms: u64) -> BucketLevel {
    BucketLevel::new(ms).expect("valid level")
}

fn params(field: &Field, level: BucketLevel, visible_range: TimeRange) -> TileParams<'_> {
    TileParams {
        field,
        level,
        visible_range,
        pan_prefetch_ratio: 0.0,
        max_bins_per_tile: 10_000,
        align_tiles_to_buckets: false,
    }
}

fn ranges(tiles: &[Tile]) -> Vec<TimeRange> {
    tiles.iter().map(|tile| tile.range).collect()
}

#[test]
fn pan_requests_only_the_exposed_edge() {
    let field = Field::new("pump-7", "flow");
    let coverage = CoverageMap::from_loaded(level(1), [range(0, 100)]);
    let strategy = LoadingStrategy::Pan {
        previous_range: range(0, 100),
        direction: PanDirection::Forward,
    };

    let tiles = strategy.determine_tiles(&params(&field, level(1), range(50, 150)), Some(&coverage));
    assert_eq!(ranges(&tiles), vec![range(100, 150)]);
}

#[test]
fn pan_prefetch_margin_extends_ahead_of_the_pan() {
    let field = Field::new("pump-7", "flow");
    let coverage = CoverageMap::from_loaded(level(1), [range(0, 100)]);
    let strategy = LoadingStrategy::Pan {
        previous_range: range(0, 100),
        direction: PanDirection::Forward,
    };
    let params = TileParams {
        pan_prefetch_ratio: 0.25,
        ..params(&field, level(1), range(50, 150))
    };

    let tiles = strategy.determine_tiles(&params, Some(&coverage));
    assert_eq!(ranges(&tiles), vec![range(100, 175)]);
    assert!(tiles.iter().all(|tile| !tile.range.overlaps(range(50, 100))));
}

#[test]
fn backward_pan_prefetches_before_the_visible_range() {
    let field = Field::new("pump-7", "flow");
    let coverage = CoverageMap::from_loaded(level(1), [range(100, 200)]);
    let strategy = LoadingStrategy::Pan {
        previous_range: range(100, 200),
        direction: PanDirection::Backward,
    };
    let params = TileParams {
        pan_prefetch_ratio: 0.5,
        ..params(&field, level(1), range(60, 160))
    };

    let tiles = strategy.determine_tiles(&params, Some(&coverage));
    assert_eq!(ranges(&tiles), vec![range(10, 100)]);
}

#[test]
fn pan_fills_interior_holes_nothing_is_fetching() {
    let field = Field::new("pump-7", "flow");
    let coverage = CoverageMap::from_loaded(level(1), [range(0, 60)]);
    let strategy = LoadingStrategy::Pan {
        previous_range: range(0, 100),
        direction: PanDirection::Forward,
    };

    let tiles = strategy.determine_tiles(&params(&field, level(1), range(50, 150)), Some(&coverage));
    assert_eq!(ranges(&tiles), vec![range(60, 150)]);
}

#[test]
fn zoom_ignores_coverage_at_the_old_level() {
    let field = Field::new("pump-7", "flow");
    let coarse = CoverageMap::from_loaded(level(60_000), [range(0, 100)]);
    assert!(!LoadingStrategy::Full.should_load(Some(&coarse), range(0, 100)));

    // Nothing is recorded at the finer level yet.
    let fine: Option<&CoverageMap> = None;
    assert!(LoadingStrategy::Full.should_load(fine, range(0, 100)));
    let tiles =
        LoadingStrategy::Full.determine_tiles(&params(&field, level(1_000), range(0, 100)), fine);

    assert_eq!(ranges(&tiles), vec![range(0, 100)]);
    assert!(tiles.iter().all(|tile| tile.level == level(1_000)));
}

#[test]
fn determine_tiles_is_idempotent_once_work_is_pending() {
    let field = Field::new("pump-7", "flow");
    let mut coverage = CoverageMap::new(level(10));
    let params = params(&field, level(10), range(0, 1_000));

    let first = LoadingStrategy::Full.determine_tiles(&params, Some(&coverage));
    assert!(!first.is_empty());
    for tile in &first {
        coverage.mark_pending(tile.range);
    }

    let second = LoadingStrategy::Full.determine_tiles(&params, Some(&coverage));
    assert!(second.is_empty());

    for tile in &first {
        coverage.mark_loaded(tile.range);
    }
    assert!(!LoadingStrategy::Full.should_load(Some(&coverage), range(0, 1_000)));
}

#[test]
fn failed_ranges_are_requested_again() {
    let field = Field::new("pump-7", "flow");
    let mut coverage = CoverageMap::from_loaded(level(1), [range(0, 40)]);
    coverage.mark_failed(range(40, 100));

    let tiles =
        LoadingStrategy::Full.determine_tiles(&params(&field, level(1), range(0, 100)), Some(&coverage));
    assert_eq!(ranges(&tiles), vec![range(40, 100)]);
}

#[test]
fn wide_gaps_split_by_max_bins_per_tile() {
    let field = Field::new("pump-7", "flow");
    let params = TileParams {
        max_bins_per_tile: 10,
        ..params(&field, level(10), range(0, 250))
    };

    let tiles = LoadingStrategy::Full.determine_tiles(&params, None);
    assert_eq!(
        ranges(&tiles),
        vec![range(0, 100), range(100, 200), range(200, 250)]
    );
}

#[test]
fn aligned_tiles_snap_outward_to_bucket_edges() {
    let field = Field::new("pump-7", "flow");
    let params = TileParams {
        align_tiles_to_buckets: true,
        ..params(&field, level(10), range(5, 95))
    };

    let tiles = LoadingStrategy::Full.determine_tiles(&params, None);
    assert_eq!(ranges(&tiles), vec![range(0, 100)]);
}

#[test]
fn tiles_nearest_the_center_come_first() {
    let field = Field::new("pump-7", "flow");
    let visible = range(0, 1_000);
    let tiles = vec![
        Tile::new(field.clone(), level(1), range(0, 100)),
        Tile::new(field.clone(), level(1), range(900, 1_000)),
        Tile::new(field.clone(), level(1), range(400, 600)),
    ];

    let ordered = prioritize_tiles(tiles, visible);
    assert_eq!(
        ranges(&ordered),
        vec![range(400, 600), range(900, 1_000), range(0, 100)]
    );
    assert_eq!(ordered[0].priority, 0);
    assert_eq!(ordered[1].priority, 400);
    assert_eq!(ordered[2].priority, 401);
}

#[test]
fn priority_ties_break_by_start_time() {
    let field = Field::new("pump-7", "flow");
    let visible = range(0, 1_000);
    let tiles = vec![
        Tile::new(field.clone(), level(1), range(900, 1_000)),
        Tile::new(field.clone(), level(1), range(0, 101)),
    ];

    let ordered = LoadingStrategy::Full.prioritize_tiles(tiles, visible);
    assert_eq!(ordered[0].priority, ordered[1].priority);
    assert_eq!(ranges(&ordered), vec![range(0, 101), range(900, 1_000)]);
}
