//! Structured logging for pipeline jobs.
//!
//! Every event carries `video_id` and `job`. Scene events add `scene` and
//! `kind`; render events add `stage` and `percent`.

use std::fmt;

use reel_models::{AssetRecord, AssetRunStatus, RenderProgress, VideoId};
use tracing::{error, info, warn, Span};

/// The long-running operations a worker performs for one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineJob {
    GenerateAssets,
    RenderVideo,
    PurgeAssets,
}

impl PipelineJob {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineJob::GenerateAssets => "generate_assets",
            PipelineJob::RenderVideo => "render_video",
            PipelineJob::PurgeAssets => "purge_assets",
        }
    }
}

impl fmt::Display for PipelineJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger bound to one video and one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    video_id: VideoId,
    job: PipelineJob,
}

impl JobLogger {
    pub fn new(video_id: &VideoId, job: PipelineJob) -> Self {
        Self {
            video_id: video_id.clone(),
            job,
        }
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn job(&self) -> PipelineJob {
        self.job
    }

    pub fn started(&self, detail: &str) {
        info!(video_id = %self.video_id, job = %self.job, "Job started: {}", detail);
    }

    /// Terminal status of an asset run; warns when any sub-task failed.
    pub fn assets_settled(&self, status: AssetRunStatus, failures: usize) {
        if failures == 0 {
            info!(video_id = %self.video_id, job = %self.job, %status, "Assets settled");
        } else {
            warn!(
                video_id = %self.video_id,
                job = %self.job,
                %status,
                failures,
                "Assets settled with failures"
            );
        }
    }

    /// A scene's image or narration that ended without a usable object.
    pub fn asset_failed(&self, record: &AssetRecord) {
        warn!(
            video_id = %self.video_id,
            job = %self.job,
            scene = record.scene_number,
            kind = %record.kind,
            error = record.error_message.as_deref().unwrap_or_default(),
            "Scene asset failed"
        );
    }

    /// A scene left out of the render for lack of usable assets.
    pub fn scene_skipped(&self, scene: u32, has_image: bool, has_audio: bool) {
        warn!(
            video_id = %self.video_id,
            job = %self.job,
            scene,
            has_image,
            has_audio,
            "Scene skipped"
        );
    }

    /// A render progress snapshot that was just persisted.
    pub fn render_stage(&self, progress: &RenderProgress) {
        info!(
            video_id = %self.video_id,
            job = %self.job,
            stage = %progress.stage,
            percent = progress.progress_percent,
            scene = progress.current_scene,
            "Render stage"
        );
    }

    pub fn finished(&self, detail: &str) {
        info!(video_id = %self.video_id, job = %self.job, "Job completed: {}", detail);
    }

    pub fn failed(&self, error: &dyn fmt::Display) {
        error!(video_id = %self.video_id, job = %self.job, error = %error, "Job failed");
    }

    /// Span for instrumenting a detached job task.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", video_id = %self.video_id, job = %self.job)
    }
}
