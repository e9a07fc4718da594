use serde::{Deserialize, Serialize};

use crate::core::{BucketLevel, Field, TimeRange};

/// Read-only loader state passed to observer hooks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoaderContext {
    pub epoch: u64,
    pub level: Option<BucketLevel>,
    pub visible_range: Option<TimeRange>,
    pub in_flight: usize,
    pub queued: usize,
}

/// Event stream exposed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoaderEvent {
    CycleStarted {
        epoch: u64,
        level: BucketLevel,
    },
    TilesDispatched {
        count: usize,
    },
    TileLoaded {
        field: Field,
        range: TimeRange,
        bins: usize,
        stale: bool,
    },
    TileFailed {
        field: Field,
        range: TimeRange,
        error: String,
        retryable: bool,
    },
    FieldReset {
        field: Field,
    },
}

/// Subscription interface for UI layers.
///
/// Events are emitted after the loader state has been updated.
pub trait LoaderObserver {
    fn id(&self) -> &str;
    fn on_event(&mut self, event: &LoaderEvent, context: LoaderContext);
}
