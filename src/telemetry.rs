//! Opt-in log output for hosts that have no subscriber of their own.
//!
//! The loader itself only emits `tracing` events; nothing is printed unless a
//! subscriber is installed.

/// Filter used when `RUST_LOG` is unset or unparsable: loader events at
/// `info`, everything else at `warn`.
#[cfg(feature = "telemetry")]
const FALLBACK_FILTER: &str = "warn,chart_tiles=info";

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without the `telemetry` feature this is a no-op returning `false`. With it,
/// the result is `false` only if some other global subscriber got there first.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));
        tracing_subscriber::fmt()
            .compact()
            .with_target(true)
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}

#[cfg(all(test, not(feature = "telemetry")))]
mod tests {
    use super::*;

    #[test]
    fn disabled_feature_installs_nothing() {
        assert!(!init_default_tracing());
    }
}
