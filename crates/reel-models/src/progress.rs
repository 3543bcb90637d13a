//! Pipeline state tracking.
//!
//! Pure helpers shared by the asset orchestrator and the render engine:
//! progress snapshots, render-loop percentages and the aggregate status
//! rules of an asset generation run. Nothing here performs I/O.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::asset::{AssetKind, AssetRunStatus};
use crate::error::ModelError;

/// Share of the render progress bar allocated to the per-scene loop.
pub const RENDER_LOOP_SHARE: u32 = 80;
/// Progress after concatenation.
pub const CONCAT_PERCENT: u8 = 85;
/// Progress after thumbnail extraction.
pub const THUMBNAIL_PERCENT: u8 = 90;
/// Progress after uploads.
pub const UPLOAD_PERCENT: u8 = 95;

/// Counters of one asset generation run.
///
/// Counters only ever grow and never exceed `total_scenes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssetProgress {
    pub total_scenes: u32,
    pub images_completed: u32,
    pub images_failed: u32,
    pub audio_completed: u32,
    pub audio_failed: u32,
}

impl AssetProgress {
    pub fn new(total_scenes: u32) -> Self {
        Self {
            total_scenes,
            ..Default::default()
        }
    }

    /// Record the outcome of one sub-task. Exactly one counter is incremented.
    ///
    /// Increments past `total_scenes` for a kind are ignored.
    pub fn record(&mut self, kind: AssetKind, succeeded: bool) {
        let (done, failed) = match kind {
            AssetKind::Image => (&mut self.images_completed, &mut self.images_failed),
            AssetKind::Audio => (&mut self.audio_completed, &mut self.audio_failed),
        };

        if *done + *failed >= self.total_scenes {
            return;
        }

        if succeeded {
            *done += 1;
        } else {
            *failed += 1;
        }
    }

    /// Count every scene's audio as completed (narration disabled for the run).
    pub fn complete_all_audio(&mut self) {
        self.audio_completed = self.total_scenes.saturating_sub(self.audio_failed);
    }

    /// Whether both batches have settled.
    pub fn is_settled(&self) -> bool {
        self.images_completed + self.images_failed == self.total_scenes
            && self.audio_completed + self.audio_failed == self.total_scenes
    }

    /// Aggregate status for these counters.
    pub fn status(&self) -> AssetRunStatus {
        aggregate_status(self)
    }
}

/// Aggregate status of an asset run.
///
/// `FAILED` when nothing succeeded, `PARTIAL` when anything failed,
/// otherwise `COMPLETED`.
pub fn aggregate_status(progress: &AssetProgress) -> AssetRunStatus {
    if progress.images_completed == 0 && progress.audio_completed == 0 {
        AssetRunStatus::Failed
    } else if progress.images_failed > 0 || progress.audio_failed > 0 {
        AssetRunStatus::Partial
    } else {
        AssetRunStatus::Completed
    }
}

/// Render loop percentage: `round(completed / total * 80)`.
pub fn render_loop_percent(completed_scenes: u32, total_scenes: u32) -> u8 {
    if total_scenes == 0 {
        return 0;
    }
    let completed = completed_scenes.min(total_scenes) as f64;
    let pct = (completed / total_scenes as f64) * RENDER_LOOP_SHARE as f64;
    pct.round() as u8
}

/// Stage of a render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderStage {
    Preparing,
    RenderingScenes,
    Concatenating,
    GeneratingThumbnail,
    Uploading,
    Completed,
    Failed,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::Preparing => "PREPARING",
            RenderStage::RenderingScenes => "RENDERING_SCENES",
            RenderStage::Concatenating => "CONCATENATING",
            RenderStage::GeneratingThumbnail => "GENERATING_THUMBNAIL",
            RenderStage::Uploading => "UPLOADING",
            RenderStage::Completed => "COMPLETED",
            RenderStage::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStage::Completed | RenderStage::Failed)
    }

    /// The stage that follows this one on the success path.
    pub fn next(&self) -> Option<RenderStage> {
        match self {
            RenderStage::Preparing => Some(RenderStage::RenderingScenes),
            RenderStage::RenderingScenes => Some(RenderStage::Concatenating),
            RenderStage::Concatenating => Some(RenderStage::GeneratingThumbnail),
            RenderStage::GeneratingThumbnail => Some(RenderStage::Uploading),
            RenderStage::Uploading => Some(RenderStage::Completed),
            RenderStage::Completed | RenderStage::Failed => None,
        }
    }

    /// Whether moving from `self` to `to` is a legal transition.
    pub fn can_transition_to(&self, to: RenderStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == RenderStage::Failed || self.next() == Some(to) || *self == to
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderStage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PREPARING" => Ok(RenderStage::Preparing),
            "RENDERING_SCENES" => Ok(RenderStage::RenderingScenes),
            "CONCATENATING" => Ok(RenderStage::Concatenating),
            "GENERATING_THUMBNAIL" => Ok(RenderStage::GeneratingThumbnail),
            "UPLOADING" => Ok(RenderStage::Uploading),
            "COMPLETED" => Ok(RenderStage::Completed),
            "FAILED" => Ok(RenderStage::Failed),
            other => Err(ModelError::UnknownStage(other.to_string())),
        }
    }
}

/// Progress snapshot of one render attempt, overwritten in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderProgress {
    pub stage: RenderStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_scene: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_scenes: Option<u32>,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RenderProgress {
    /// Snapshot at a stage with a given percentage.
    pub fn at(stage: RenderStage, progress_percent: u8) -> Self {
        Self {
            stage,
            current_scene: None,
            total_scenes: None,
            progress_percent: progress_percent.min(100),
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn preparing() -> Self {
        Self::at(RenderStage::Preparing, 0)
    }

    /// Snapshot inside the scene loop after `completed` of `total` scenes.
    pub fn rendering(completed: u32, total: u32) -> Self {
        Self {
            current_scene: Some(completed),
            total_scenes: Some(total),
            ..Self::at(RenderStage::RenderingScenes, render_loop_percent(completed, total))
        }
    }

    pub fn completed() -> Self {
        Self::at(RenderStage::Completed, 100)
    }

    /// Failed snapshot; keeps the percentage reached so far.
    pub fn failed(last_percent: u8, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::at(RenderStage::Failed, last_percent)
        }
    }
}

/// Terminal result of a render attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderOutcome {
    Completed {
        video_url: String,
        thumbnail_url: String,
        video_key: String,
        thumbnail_key: String,
        duration_seconds: u64,
        finished_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        finished_at: DateTime<Utc>,
    },
}

impl RenderOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RenderOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_status_rules() {
        let mut p = AssetProgress::new(3);
        assert_eq!(p.status(), AssetRunStatus::Failed);

        p.images_completed = 3;
        p.audio_completed = 3;
        assert_eq!(p.status(), AssetRunStatus::Completed);

        p.images_completed = 2;
        p.images_failed = 1;
        assert_eq!(p.status(), AssetRunStatus::Partial);

        let failed = AssetProgress {
            total_scenes: 2,
            images_failed: 2,
            audio_failed: 2,
            ..Default::default()
        };
        assert_eq!(failed.status(), AssetRunStatus::Failed);
    }

    #[test]
    fn test_images_failed_but_audio_ok_is_partial() {
        let p = AssetProgress {
            total_scenes: 2,
            images_failed: 2,
            audio_completed: 2,
            ..Default::default()
        };
        assert_eq!(p.status(), AssetRunStatus::Partial);
    }

    #[test]
    fn test_record_never_exceeds_total() {
        let mut p = AssetProgress::new(2);
        p.record(AssetKind::Image, true);
        p.record(AssetKind::Image, false);
        p.record(AssetKind::Image, true);
        assert_eq!(p.images_completed, 1);
        assert_eq!(p.images_failed, 1);

        p.record(AssetKind::Audio, true);
        assert_eq!(p.audio_completed, 1);
        assert!(!p.is_settled());
        p.record(AssetKind::Audio, true);
        assert!(p.is_settled());
    }

    #[test]
    fn test_complete_all_audio() {
        let mut p = AssetProgress::new(4);
        p.complete_all_audio();
        assert_eq!(p.audio_completed, 4);
        assert_eq!(p.audio_failed, 0);
    }

    #[test]
    fn test_render_loop_percent() {
        assert_eq!(render_loop_percent(0, 3), 0);
        assert_eq!(render_loop_percent(1, 3), 27);
        assert_eq!(render_loop_percent(2, 3), 53);
        assert_eq!(render_loop_percent(3, 3), 80);
        assert_eq!(render_loop_percent(5, 3), 80);
        assert_eq!(render_loop_percent(1, 0), 0);
    }

    #[test]
    fn test_stage_transitions() {
        assert!(RenderStage::Preparing.can_transition_to(RenderStage::RenderingScenes));
        assert!(RenderStage::Uploading.can_transition_to(RenderStage::Completed));
        assert!(RenderStage::Concatenating.can_transition_to(RenderStage::Failed));
        assert!(!RenderStage::Preparing.can_transition_to(RenderStage::Uploading));
        assert!(!RenderStage::Completed.can_transition_to(RenderStage::Failed));
        assert!(!RenderStage::Failed.can_transition_to(RenderStage::Preparing));
    }

    #[test]
    fn test_stage_round_trip_names() {
        for stage in [
            RenderStage::Preparing,
            RenderStage::RenderingScenes,
            RenderStage::Concatenating,
            RenderStage::GeneratingThumbnail,
            RenderStage::Uploading,
            RenderStage::Completed,
            RenderStage::Failed,
        ] {
            assert_eq!(stage.as_str().parse::<RenderStage>().unwrap(), stage);
        }
        assert!("DONE".parse::<RenderStage>().is_err());
    }

    #[test]
    fn test_render_progress_snapshots() {
        let p = RenderProgress::rendering(1, 2);
        assert_eq!(p.stage, RenderStage::RenderingScenes);
        assert_eq!(p.current_scene, Some(1));
        assert_eq!(p.progress_percent, 40);

        let f = RenderProgress::failed(85, "boom");
        assert_eq!(f.stage, RenderStage::Failed);
        assert_eq!(f.progress_percent, 85);
        assert_eq!(f.error.as_deref(), Some("boom"));

        assert_eq!(RenderProgress::completed().progress_percent, 100);
    }

    #[test]
    fn test_render_outcome_tagged() {
        let outcome = RenderOutcome::Failed {
            error: "x".to_string(),
            finished_at: Utc::now(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert!(!outcome.is_completed());
    }
}
