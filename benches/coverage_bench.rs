use chart_tiles::api::{LoadingStrategy, TileParams, prioritize_tiles};
use chart_tiles::core::{
    BucketLevel, BucketingConfig, CoverageMap, Field, IntervalSet, TimeRange, choose_bucket,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn scattered_ranges(count: i64) -> Vec<TimeRange> {
    (0..count)
        .map(|i| {
            // Deterministic shuffle so inserts do not arrive in order.
            let slot = (i * 7_919) % count;
            let from_ms = slot * 1_000;
            TimeRange::new(from_ms, from_ms + 600).expect("valid range")
        })
        .collect()
}

fn bench_choose_bucket(c: &mut Criterion) {
    let config = BucketingConfig::default();

    c.bench_function("choose_bucket_day_1920px", |b| {
        b.iter(|| {
            let _ = choose_bucket(black_box(86_400_000), black_box(1_920), &config)
                .expect("level");
        })
    });
}

fn bench_coverage_merge_10k(c: &mut Criterion) {
    let ranges = scattered_ranges(10_000);

    c.bench_function("coverage_mark_loaded_10k", |b| {
        b.iter(|| {
            let mut map = CoverageMap::new(BucketLevel::SECOND);
            for range in &ranges {
                map.mark_loaded(black_box(*range));
            }
            map
        })
    });

    c.bench_function("interval_set_from_ranges_10k", |b| {
        b.iter(|| IntervalSet::from_ranges(black_box(ranges.iter().copied())))
    });
}

fn bench_gap_query_and_tiles(c: &mut Criterion) {
    let map = CoverageMap::from_loaded(BucketLevel::SECOND, scattered_ranges(10_000));
    let visible = TimeRange::new(0, 10_000_000).expect("valid range");
    let field = Field::new("bench", "value");
    let params = TileParams {
        field: &field,
        level: BucketLevel::SECOND,
        visible_range: visible,
        pan_prefetch_ratio: 0.25,
        max_bins_per_tile: 2_000,
        align_tiles_to_buckets: true,
    };

    c.bench_function("coverage_query_10k_intervals", |b| {
        b.iter(|| map.query(black_box(visible)))
    });

    c.bench_function("determine_and_prioritize_tiles_10k_gaps", |b| {
        b.iter(|| {
            let tiles = LoadingStrategy::Full.determine_tiles(black_box(&params), Some(&map));
            prioritize_tiles(tiles, visible)
        })
    });
}

criterion_group!(
    benches,
    bench_choose_bucket,
    bench_coverage_merge_10k,
    bench_gap_query_and_tiles
);
criterion_main!(benches);
