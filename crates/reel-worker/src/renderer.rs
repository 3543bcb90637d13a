//! Scene render engine.
//!
//! Turns a video's usable asset records into one finished video:
//! download each scene's image and narration, render one clip per scene
//! strictly in plan order, concatenate, extract a thumbnail and upload.
//!
//! Progress moves through `PREPARING → RENDERING_SCENES → CONCATENATING →
//! GENERATING_THUMBNAIL → UPLOADING → COMPLETED`; any error moves it to
//! `FAILED`. The scratch workspace is removed on every exit path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use reel_media::{MediaTransform, VisualEffect};
use reel_models::{
    AssetKind, AssetRecord, RenderOutcome, RenderProgress, RenderStage, VideoId, CONCAT_PERCENT,
    THUMBNAIL_PERCENT, UPLOAD_PERCENT,
};
use reel_storage::{keys, ObjectStore};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobLogger, PipelineJob};
use crate::store::{latest_by_scene, PipelineStore};
use crate::workspace::RenderWorkspace;

/// URLs and duration of a finished render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_seconds: u64,
}

/// Persists render progress, enforcing the stage order.
struct RenderTracker<'a> {
    logger: &'a JobLogger,
    store: &'a dyn PipelineStore,
    stage: Option<RenderStage>,
    last_percent: u8,
}

impl<'a> RenderTracker<'a> {
    fn new(logger: &'a JobLogger, store: &'a dyn PipelineStore) -> Self {
        Self {
            logger,
            store,
            stage: None,
            last_percent: 0,
        }
    }

    async fn update(&mut self, progress: RenderProgress) -> WorkerResult<()> {
        if let Some(from) = self.stage {
            if !from.can_transition_to(progress.stage) {
                return Err(WorkerError::InvalidTransition {
                    from,
                    to: progress.stage,
                });
            }
        }

        self.store
            .save_render_progress(self.logger.video_id(), &progress)
            .await?;
        self.logger.render_stage(&progress);
        self.stage = Some(progress.stage);
        self.last_percent = progress.progress_percent;
        Ok(())
    }

    async fn stage(&mut self, stage: RenderStage, percent: u8) -> WorkerResult<()> {
        self.update(RenderProgress::at(stage, percent)).await
    }

    /// Persist the terminal failure. Errors here are logged, never raised.
    async fn fail(&self, message: &str) {
        if self.stage.is_some_and(|s| s.is_terminal()) {
            return;
        }

        let video_id = self.logger.video_id();
        let progress = RenderProgress::failed(self.last_percent, message);
        if let Err(e) = self.store.save_render_progress(video_id, &progress).await {
            error!(video_id = %video_id, error = %e, "Failed to persist render progress");
        }

        let outcome = RenderOutcome::Failed {
            error: message.to_string(),
            finished_at: Utc::now(),
        };
        if let Err(e) = self.store.save_render_outcome(video_id, &outcome).await {
            error!(video_id = %video_id, error = %e, "Failed to persist render outcome");
        }
    }
}

/// Renders finished videos from generated assets.
pub struct SceneRenderer {
    store: Arc<dyn PipelineStore>,
    objects: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaTransform>,
    config: WorkerConfig,
}

impl SceneRenderer {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        objects: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaTransform>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            objects,
            media,
            config,
        }
    }

    /// Render, publish and record the final video.
    ///
    /// On failure the terminal `FAILED` state is persisted and the error is
    /// returned to the caller. Calling again after a failure starts over.
    pub async fn render_video(&self, video_id: &VideoId) -> WorkerResult<RenderResult> {
        let logger = JobLogger::new(video_id, PipelineJob::RenderVideo);
        logger.started("rendering video");

        let mut tracker = RenderTracker::new(&logger, self.store.as_ref());
        let mut workspace: Option<RenderWorkspace> = None;

        let result = self.run(video_id, &logger, &mut tracker, &mut workspace).await;

        if let Some(ws) = workspace.take() {
            if let Err(e) = ws.close() {
                warn!(video_id = %video_id, error = %e, "Failed to remove render workspace");
            }
        }

        match result {
            Ok(result) => {
                logger.finished(&format!(
                    "{}s video at {}",
                    result.duration_seconds, result.video_url
                ));
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                logger.failed(&message);
                tracker.fail(&message).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        video_id: &VideoId,
        logger: &JobLogger,
        tracker: &mut RenderTracker<'_>,
        workspace: &mut Option<RenderWorkspace>,
    ) -> WorkerResult<RenderResult> {
        tracker.update(RenderProgress::preparing()).await?;

        let plan = self
            .store
            .load_plan(video_id)
            .await?
            .ok_or_else(|| WorkerError::PlanMissing(video_id.to_string()))?;

        if let Some(outcome) = self.store.load_asset_outcome(video_id).await? {
            if !outcome.status.is_usable() {
                return Err(WorkerError::NoUsableAssets(video_id.to_string()));
            }
        }

        let records = self.store.list_assets(video_id).await?;
        let images = usable_by_scene(&records, AssetKind::Image);
        let audio = usable_by_scene(&records, AssetKind::Audio);

        if !plan.scenes.iter().any(|s| images.contains_key(&s.scene_number)) {
            return Err(WorkerError::NoUsableAssets(video_id.to_string()));
        }

        let ws = RenderWorkspace::create(&self.config.work_dir, video_id).await?;
        let ws = workspace.insert(ws);
        let resolution = plan.aspect_ratio.output_resolution();
        let total = plan.total_scenes();
        tracker.update(RenderProgress::rendering(0, total)).await?;

        let mut clips: Vec<PathBuf> = Vec::new();
        for (index, scene) in plan.scenes.iter().enumerate() {
            let n = scene.scene_number;

            match (images.get(&n), audio.get(&n)) {
                (Some(image), Some(narration)) => {
                    let image_path = ws.image_path(n);
                    let audio_path = ws.audio_path(n);
                    let clip_path = ws.clip_path(n);
                    let effect = VisualEffect::for_scene(index);

                    self.fetch(image, &image_path).await?;
                    self.fetch(narration, &audio_path).await?;

                    debug!(
                        video_id = %video_id,
                        scene = n,
                        effect = effect.as_str(),
                        "Rendering scene clip"
                    );
                    self.media
                        .render_scene_clip(&image_path, &audio_path, &clip_path, resolution, effect)
                        .await?;
                    clips.push(clip_path);
                }
                (image, narration) => {
                    logger.scene_skipped(n, image.is_some(), narration.is_some());
                }
            }

            tracker
                .update(RenderProgress::rendering(index as u32 + 1, total))
                .await?;
        }

        if clips.is_empty() {
            return Err(WorkerError::NoClipsRendered(video_id.to_string()));
        }

        debug!(video_id = %video_id, clips = clips.len(), total, "Scene clips rendered");

        let final_path = ws.final_video_path();
        let loop_percent = tracker.last_percent;
        tracker.stage(RenderStage::Concatenating, loop_percent).await?;
        self.media.concatenate_clips(&clips, &final_path).await?;

        tracker
            .stage(RenderStage::GeneratingThumbnail, CONCAT_PERCENT)
            .await?;
        let thumbnail_path = ws.thumbnail_path();
        self.media.extract_thumbnail(&final_path, &thumbnail_path).await?;

        tracker.stage(RenderStage::Uploading, THUMBNAIL_PERCENT).await?;
        let video_key = keys::final_video_key(video_id);
        let thumbnail_key = keys::thumbnail_key(video_id);

        let video_url = self
            .publish(video_id, &final_path, &video_key, keys::CONTENT_TYPE_MP4)
            .await?;
        let thumbnail_url = self
            .publish(video_id, &thumbnail_path, &thumbnail_key, keys::CONTENT_TYPE_JPEG)
            .await?;

        tracker.stage(RenderStage::Uploading, UPLOAD_PERCENT).await?;

        let duration = self.media.probe_duration(&final_path).await;
        let duration_seconds = duration.max(0.0).round() as u64;

        let outcome = RenderOutcome::Completed {
            video_url: video_url.clone(),
            thumbnail_url: thumbnail_url.clone(),
            video_key,
            thumbnail_key,
            duration_seconds,
            finished_at: Utc::now(),
        };
        self.store.save_render_outcome(video_id, &outcome).await?;
        tracker.update(RenderProgress::completed()).await?;

        Ok(RenderResult {
            video_url,
            thumbnail_url,
            duration_seconds,
        })
    }

    /// Download one stored asset into the workspace.
    async fn fetch(&self, record: &AssetRecord, dest: &Path) -> WorkerResult<()> {
        let key = record.storage_key.as_deref().unwrap_or_default();
        let bytes = self.objects.download(key).await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!(key = %key, bytes = bytes.len(), path = %dest.display(), "Downloaded asset");
        Ok(())
    }

    async fn publish(
        &self,
        video_id: &VideoId,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> WorkerResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();
        let metadata = HashMap::from([("video-id".to_string(), video_id.to_string())]);

        let url = self.objects.upload(bytes, key, content_type, metadata).await?;
        info!(video_id = %video_id, key = %key, bytes = size, "Uploaded render output");
        Ok(url)
    }
}

/// Latest record per scene, kept only when it is usable.
fn usable_by_scene(records: &[AssetRecord], kind: AssetKind) -> HashMap<u32, &AssetRecord> {
    latest_by_scene(records, kind)
        .into_iter()
        .filter(|(_, r)| r.is_usable())
        .collect()
}
