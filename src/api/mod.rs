mod engine;
mod engine_config;
mod engine_init;
mod field_catalog;
mod observer_dispatch;
mod observer_registry;
mod request_manager;
mod response_controller;
mod snapshot_controller;
mod stats;
mod strategy;
mod transition;
mod viewport_controller;

pub use engine::TileLoader;
pub use engine_config::{LoaderConfig, QualityThresholds};
pub use request_manager::{
    ApplyReport, Completion, Epoch, RequestManager, RequestState, SubmitReport, TileKey,
    TileOutcome,
};
pub use snapshot_controller::FieldSnapshot;
pub use stats::{CoverageStats, Quality, classify_quality, project_stats};
pub use strategy::{LoadingStrategy, TileParams, prioritize_tiles};
pub use transition::{PanDirection, Transition, classify_transition};
pub use viewport_controller::CycleSummary;
