use approx::assert_relative_eq;
use chart_tiles::api::{LoaderConfig, QualityThresholds};
use chart_tiles::core::BucketingConfig;
use chart_tiles::error::LoaderError;

#[test]
fn defaults_match_documented_values() {
    let config = LoaderConfig::default();

    assert_eq!(config.max_in_flight, 4);
    assert_relative_eq!(config.pan_prefetch_ratio, 0.25);
    assert_eq!(config.max_bins_per_tile, 2_000);
    assert!(config.align_tiles_to_buckets);
    assert_relative_eq!(config.bucketing.target_points_per_px, 1.0);
    assert_eq!(config.bucketing.min_target_points, 10);
    assert!(config.bucketing.enable_weekly_multiples);
    assert_eq!(config.bucketing.max_weeks_multiple, 52);
    assert_eq!(config.bucketing.nice_seconds.first(), Some(&1));
    assert_eq!(config.bucketing.nice_seconds.last(), Some(&86_400));
    assert_eq!(config.quality, QualityThresholds::default());
    config.validate().expect("defaults are valid");
}

#[test]
fn partial_json_fills_in_defaults() {
    let config = LoaderConfig::from_json_str(
        r#"{ "max_in_flight": 8, "bucketing": { "target_points_per_px": 2.0 } }"#,
    )
    .expect("parse config");

    assert_eq!(config.max_in_flight, 8);
    assert_relative_eq!(config.bucketing.target_points_per_px, 2.0);
    assert_eq!(config.bucketing.min_target_points, 10);
    assert_relative_eq!(config.pan_prefetch_ratio, 0.25);
}

#[test]
fn json_round_trip_preserves_config() {
    let config = LoaderConfig::new()
        .with_max_in_flight(2)
        .with_pan_prefetch_ratio(0.5)
        .with_max_bins_per_tile(500)
        .with_align_tiles_to_buckets(false)
        .with_bucketing(BucketingConfig {
            enable_weekly_multiples: false,
            ..BucketingConfig::default()
        });

    let json = config.to_json_string().expect("encode config");
    let decoded = LoaderConfig::from_json_str(&json).expect("decode config");
    assert_eq!(decoded, config);
}

#[test]
fn invalid_values_are_rejected() {
    let cases = [
        LoaderConfig::default().with_max_in_flight(0),
        LoaderConfig::default().with_pan_prefetch_ratio(-0.1),
        LoaderConfig::default().with_pan_prefetch_ratio(f64::NAN),
        LoaderConfig::default().with_max_bins_per_tile(0),
        LoaderConfig::default().with_quality(QualityThresholds {
            good_coverage: 0.4,
            poor_coverage: 0.6,
            max_gaps_before_poor: 3,
        }),
        LoaderConfig::default().with_bucketing(BucketingConfig {
            nice_seconds: vec![0, 1],
            ..BucketingConfig::default()
        }),
    ];

    for config in cases {
        assert!(matches!(
            config.validate(),
            Err(LoaderError::InvalidConfig(_))
        ));
    }
}

#[test]
fn malformed_json_is_a_config_error() {
    assert!(matches!(
        LoaderConfig::from_json_str("{ not json"),
        Err(LoaderError::InvalidConfig(_))
    ));
    assert!(matches!(
        LoaderConfig::from_json_str(r#"{ "max_in_flight": 0 }"#),
        Err(LoaderError::InvalidConfig(_))
    ));
}
