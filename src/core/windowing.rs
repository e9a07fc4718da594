use crate::core::{Bin, TimeRange};

/// Returns the bins of a time-sorted slice that fall inside a half-open window.
#[must_use]
pub fn bins_in_time_window(bins: &[Bin], window: TimeRange) -> &[Bin] {
    let start = bins.partition_point(|bin| bin.time_ms < window.from_ms());
    let end = bins.partition_point(|bin| bin.time_ms < window.to_ms());
    &bins[start..end.max(start)]
}

/// Index span a window occupies in a time-sorted slice.
#[must_use]
pub fn window_index_span(bins: &[Bin], window: TimeRange) -> (usize, usize) {
    let start = bins.partition_point(|bin| bin.time_ms < window.from_ms());
    let end = bins.partition_point(|bin| bin.time_ms < window.to_ms());
    (start, end.max(start))
}

/// Returns `true` when every bin of `bins` lies inside `window` and the slice is time-sorted.
#[must_use]
pub fn bins_fit_window(bins: &[Bin], window: TimeRange) -> bool {
    bins.iter().all(|bin| window.contains_ms(bin.time_ms))
        && bins.windows(2).all(|pair| pair[0].time_ms <= pair[1].time_ms)
}
