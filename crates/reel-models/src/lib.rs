//! Shared data models for the media production pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video plans and scenes
//! - Generated asset records and run outcomes
//! - Asset and render progress snapshots
//! - Pure pipeline state helpers (percentages, aggregate status)

pub mod asset;
pub mod error;
pub mod plan;
pub mod progress;
pub mod video;

// Re-export common types
pub use asset::{
    join_errors, AssetKind, AssetRecord, AssetRunOutcome, AssetRunStatus, StoredAsset,
};
pub use error::{ModelError, ModelResult};
pub use plan::{Scene, VideoPlan, VOICE_NONE};
pub use progress::{
    aggregate_status, render_loop_percent, AssetProgress, RenderOutcome, RenderProgress,
    RenderStage, CONCAT_PERCENT, THUMBNAIL_PERCENT, UPLOAD_PERCENT,
};
pub use video::{AspectRatio, GenerationSize, Resolution, VideoId};
