use serde::{Deserialize, Serialize};

use crate::core::{BucketLevel, ViewportRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanDirection {
    /// Toward earlier timestamps.
    Backward,
    /// Toward later timestamps.
    Forward,
}

/// How a field's viewport moved since the previous evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Nothing has been loaded for the field yet.
    Initial,
    /// Same level and span, shifted by `delta_ms`.
    Pan {
        direction: PanDirection,
        delta_ms: u64,
    },
    /// Different level, or a different span at the same level.
    Zoom {
        from_level: BucketLevel,
        to_level: BucketLevel,
    },
    /// Same level and range (resize or re-evaluation).
    Unchanged,
}

/// Classifies the current viewport against the previous cycle for one field.
///
/// `last_level` is the level the field was last evaluated at; `level` is the
/// level chosen for `current`.
#[must_use]
pub fn classify_transition(
    previous: Option<&ViewportRequest>,
    current: &ViewportRequest,
    last_level: Option<BucketLevel>,
    level: BucketLevel,
) -> Transition {
    let Some(last_level) = last_level else {
        return Transition::Initial;
    };
    if last_level != level {
        return Transition::Zoom {
            from_level: last_level,
            to_level: level,
        };
    }
    let Some(previous) = previous else {
        return Transition::Initial;
    };

    let before = previous.visible_range;
    let after = current.visible_range;
    if before == after {
        return Transition::Unchanged;
    }
    if before.len_ms() != after.len_ms() {
        return Transition::Zoom {
            from_level: last_level,
            to_level: level,
        };
    }

    let direction = if after.from_ms() > before.from_ms() {
        PanDirection::Forward
    } else {
        PanDirection::Backward
    };
    Transition::Pan {
        direction,
        delta_ms: after.from_ms().abs_diff(before.from_ms()),
    }
}
