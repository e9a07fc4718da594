use chart_tiles::core::{BucketLevel, BucketingConfig, TimeRange, choose_bucket, ideal_bucket_ms};
use chart_tiles::error::LoaderError;
use chrono::{TimeZone, Utc};

#[test]
fn one_day_at_two_points_per_pixel_snaps_to_one_minute() {
    let from = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid start");
    let to = Utc
        .with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
        .single()
        .expect("valid end");
    let range = TimeRange::from_datetimes(from, to).expect("valid range");
    let config = BucketingConfig {
        target_points_per_px: 2.0,
        ..BucketingConfig::default()
    };

    assert_eq!(range.len_ms(), 86_400_000);
    assert_eq!(ideal_bucket_ms(range.len_ms(), 1_000, 2.0), 43_200.0);

    let level = choose_bucket(range.len_ms(), 1_000, &config).expect("level");
    assert_eq!(level.as_ms(), 60_000);
}

#[test]
fn same_inputs_give_same_level() {
    let config = BucketingConfig::default();
    let first = choose_bucket(3_600_000, 800, &config).expect("level");
    let second = choose_bucket(3_600_000, 800, &config).expect("level");

    assert_eq!(first, second);
    let ideal = ideal_bucket_ms(3_600_000, 800, config.target_points_per_px);
    assert!(first.as_ms() as f64 >= ideal);
    assert_eq!(first.as_ms(), 5_000);
}

#[test]
fn long_ranges_extend_with_whole_weeks() {
    let config = BucketingConfig::default();
    let year_ms = 365 * BucketLevel::DAY.as_ms();

    let level = choose_bucket(year_ms, 20, &config).expect("level");
    let week = BucketLevel::WEEK.as_ms();
    assert_eq!(level.as_ms() % week, 0);
    assert_eq!(level.as_ms(), 3 * week);
}

#[test]
fn weekly_multiples_are_capped() {
    let config = BucketingConfig {
        max_weeks_multiple: 4,
        min_target_points: 0,
        ..BucketingConfig::default()
    };
    let ten_years_ms = 3_650 * BucketLevel::DAY.as_ms();

    let level = choose_bucket(ten_years_ms, 10, &config).expect("level");
    assert_eq!(level.as_ms(), 4 * BucketLevel::WEEK.as_ms());
}

#[test]
fn without_weekly_multiples_the_ladder_max_is_the_ceiling() {
    let config = BucketingConfig {
        enable_weekly_multiples: false,
        min_target_points: 0,
        ..BucketingConfig::default()
    };
    let year_ms = 365 * BucketLevel::DAY.as_ms();

    let level = choose_bucket(year_ms, 10, &config).expect("level");
    assert_eq!(level, BucketLevel::DAY);
}

#[test]
fn min_target_points_steps_one_rung_finer() {
    let config = BucketingConfig {
        target_points_per_px: 0.01,
        min_target_points: 10,
        ..BucketingConfig::default()
    };
    // ideal = 60_000 / (100 * 0.01) = 60_000 -> one minute, a single bucket.
    let level = choose_bucket(60_000, 100, &config).expect("level");
    assert_eq!(level.as_ms(), 30_000);
}

#[test]
fn tiny_ranges_clamp_to_the_finest_rung() {
    let config = BucketingConfig::default();
    let level = choose_bucket(500, 1_920, &config).expect("level");
    assert_eq!(level, BucketLevel::SECOND);
}

#[test]
fn zero_pixel_width_is_rejected() {
    let config = BucketingConfig::default();
    let err = choose_bucket(1_000, 0, &config).expect_err("zero width must fail");
    assert_eq!(err, LoaderError::InvalidViewport { pixel_width: 0 });
}

#[test]
fn invalid_bucketing_config_is_rejected() {
    let config = BucketingConfig {
        target_points_per_px: 0.0,
        ..BucketingConfig::default()
    };
    assert!(matches!(
        choose_bucket(1_000, 100, &config),
        Err(LoaderError::InvalidConfig(_))
    ));

    let config = BucketingConfig {
        nice_seconds: Vec::new(),
        ..BucketingConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn week_cap_beyond_the_time_axis_is_a_config_error() {
    let config = BucketingConfig {
        target_points_per_px: 1e-12,
        max_weeks_multiple: u64::MAX,
        ..BucketingConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(LoaderError::InvalidConfig(_))
    ));
    assert!(matches!(
        choose_bucket(1_000_000_000_000, 800, &config),
        Err(LoaderError::InvalidConfig(_))
    ));

    let config = BucketingConfig {
        nice_seconds: vec![1, u64::MAX / 1_000],
        ..BucketingConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn widest_allowed_week_cap_stays_on_the_time_axis() {
    let week = BucketLevel::WEEK.as_ms();
    let max_weeks = i64::MAX as u64 / week;
    let config = BucketingConfig {
        target_points_per_px: 1e-12,
        max_weeks_multiple: max_weeks,
        ..BucketingConfig::default()
    };
    config.validate().expect("cap at the axis limit is valid");

    let level = choose_bucket(1_000_000_000_000, 800, &config).expect("level");
    // One bucket covers the range, so the fallback steps down a week.
    assert_eq!(level.as_ms(), (max_weeks - 1) * week);
    assert!(level.as_ms() <= i64::MAX as u64);
}
