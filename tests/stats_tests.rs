use approx::assert_relative_eq;
use chart_tiles::api::{QualityThresholds, Quality, classify_quality, project_stats};
use chart_tiles::core::{Bin, BinStore, BucketLevel, CoverageMap, Field, SeriesKey, TimeRange};

fn range(from_ms: i64, to_ms: i64) -> TimeRange {
    TimeRange::new(from_ms, to_ms).expect("valid range")
}

#[test]
fn quality_labels_follow_thresholds() {
    let thresholds = QualityThresholds::default();

    assert_eq!(classify_quality(1.0, 0, thresholds), Quality::Good);
    assert_eq!(classify_quality(0.98, 0, thresholds), Quality::Good);
    assert_eq!(classify_quality(0.99, 1, thresholds), Quality::Medium);
    assert_eq!(classify_quality(0.97, 0, thresholds), Quality::Medium);
    assert_eq!(classify_quality(0.5, 3, thresholds), Quality::Medium);
    assert_eq!(classify_quality(0.49, 0, thresholds), Quality::Poor);
    assert_eq!(classify_quality(0.9, 4, thresholds), Quality::Poor);
}

#[test]
fn custom_thresholds_are_applied() {
    let thresholds = QualityThresholds {
        good_coverage: 0.9,
        poor_coverage: 0.2,
        max_gaps_before_poor: 10,
    };
    assert_eq!(classify_quality(0.91, 0, thresholds), Quality::Good);
    assert_eq!(classify_quality(0.3, 8, thresholds), Quality::Medium);
}

#[test]
fn stats_project_coverage_gaps_and_density() {
    let field = Field::new("boiler", "temp");
    let level = BucketLevel::SECOND;
    let key = SeriesKey::new(field, level);

    let mut map = CoverageMap::new(level);
    map.mark_loaded(range(0, 4_000));
    map.mark_loaded(range(6_000, 8_000));
    map.mark_pending(range(8_000, 9_000));
    map.mark_failed(range(9_000, 10_000));

    let mut bins = BinStore::new();
    bins.replace_range(
        key.clone(),
        range(0, 4_000),
        (0..4).map(|i| Bin::new(i * 1_000, [1.0])).collect(),
    );
    bins.replace_range(
        key.clone(),
        range(6_000, 8_000),
        vec![Bin::new(6_000, [2.0]), Bin::new(7_000, [3.0])],
    );

    let stats = project_stats(
        Some(&map),
        &bins,
        &key,
        range(0, 10_000),
        12,
        QualityThresholds::default(),
    );

    assert_relative_eq!(stats.coverage, 0.6);
    assert_eq!(stats.gaps, 2);
    assert_eq!(stats.visible_points, 6);
    assert_relative_eq!(stats.density, 0.5);
    assert_eq!(stats.pending_intervals, 1);
    assert_eq!(stats.failed_intervals, 1);
    assert_eq!(stats.quality, Quality::Medium);
}

#[test]
fn untouched_series_is_reported_as_unloaded() {
    let key = SeriesKey::new(Field::new("boiler", "temp"), BucketLevel::SECOND);
    let stats = project_stats(
        None,
        &BinStore::new(),
        &key,
        range(0, 10_000),
        100,
        QualityThresholds::default(),
    );

    assert_relative_eq!(stats.coverage, 0.0);
    assert_eq!(stats.gaps, 1);
    assert_eq!(stats.visible_points, 0);
    assert_eq!(stats.quality, Quality::Poor);
}
