//! Parallel per-scene asset generation.
//!
//! Every scene's image and every scene's narration is an independent task.
//! A failing task is recorded as a failed [`AssetRecord`] and never stops its
//! siblings; only plan-level problems (missing or invalid plan) fail the run.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use reel_genai::{is_known_voice, GenerationAdapter, DEFAULT_VOICE_ID};
use reel_models::{
    aggregate_status, AssetKind, AssetProgress, AssetRecord, AssetRunOutcome, AssetRunStatus,
    GenerationSize, Scene, StoredAsset, VideoId, VideoPlan,
};
use reel_storage::{keys, ObjectStore};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{JobLogger, PipelineJob};
use crate::store::PipelineStore;

/// Everything one generation run produced.
#[derive(Debug, Clone)]
pub struct AssetRunReport {
    pub images: Vec<AssetRecord>,
    pub audio: Vec<AssetRecord>,
    /// One entry per failing scene/kind pair, e.g. `Scene 2 image: ...`
    pub errors: Vec<String>,
    pub progress: AssetProgress,
    pub status: AssetRunStatus,
}

/// Fans a plan out into image and narration generation tasks.
pub struct AssetOrchestrator {
    adapter: GenerationAdapter,
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn PipelineStore>,
    config: WorkerConfig,
}

/// Shared counters, persisted after every sub-task.
struct ProgressLedger<'a> {
    video_id: &'a VideoId,
    store: &'a dyn PipelineStore,
    progress: Mutex<AssetProgress>,
}

impl<'a> ProgressLedger<'a> {
    /// Count one finished sub-task and persist the new snapshot.
    ///
    /// The lock is held across the write so persisted snapshots follow counter order.
    async fn record(&self, kind: AssetKind, succeeded: bool) {
        let mut progress = self.progress.lock().await;
        progress.record(kind, succeeded);
        if let Err(e) = self.store.save_asset_progress(self.video_id, &progress).await {
            error!(video_id = %self.video_id, error = %e, "Failed to persist asset progress");
        }
    }

    async fn snapshot(&self) -> AssetProgress {
        *self.progress.lock().await
    }
}

impl AssetOrchestrator {
    pub fn new(
        adapter: GenerationAdapter,
        objects: Arc<dyn ObjectStore>,
        store: Arc<dyn PipelineStore>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            adapter,
            objects,
            store,
            config,
        }
    }

    /// Generate every image and narration track for a video.
    ///
    /// Returns after both batches settle, with the terminal outcome persisted.
    pub async fn generate_all_assets(&self, video_id: &VideoId) -> WorkerResult<AssetRunReport> {
        let logger = JobLogger::new(video_id, PipelineJob::GenerateAssets);

        let plan = self
            .store
            .load_plan(video_id)
            .await?
            .ok_or_else(|| WorkerError::PlanMissing(video_id.to_string()))?;
        plan.validate()?;
        if plan.scenes.len() > self.config.max_scenes {
            return Err(WorkerError::invalid_plan(format!(
                "plan has {} scenes, limit is {}",
                plan.scenes.len(),
                self.config.max_scenes
            )));
        }

        let size = plan.aspect_ratio.generation_size();
        let narration_disabled = plan.narration_disabled();

        logger.started(&format!(
            "{} scenes, aspect {}, size {}, voice {}",
            plan.scenes.len(),
            plan.aspect_ratio,
            size,
            plan.voice
        ));

        if !narration_disabled && !is_known_voice(&plan.voice) {
            warn!(
                video_id = %video_id,
                voice = %plan.voice,
                fallback = DEFAULT_VOICE_ID,
                "Unknown voice key, using default voice"
            );
        }

        let mut initial = AssetProgress::new(plan.total_scenes());
        if narration_disabled {
            initial.complete_all_audio();
        }
        self.store.save_asset_progress(video_id, &initial).await?;

        let ledger = ProgressLedger {
            video_id,
            store: self.store.as_ref(),
            progress: Mutex::new(initial),
        };

        let image_tasks: Vec<_> = plan
            .scenes
            .iter()
            .map(|scene| self.generate_scene_image(&plan, scene, size, &ledger))
            .collect();

        let audio_tasks: Vec<_> = if narration_disabled {
            Vec::new()
        } else {
            plan.scenes
                .iter()
                .map(|scene| self.generate_scene_audio(&plan, scene, &ledger))
                .collect()
        };

        let (images, audio) = tokio::join!(join_all(image_tasks), join_all(audio_tasks));
        let audio: Vec<AssetRecord> = audio.into_iter().flatten().collect();

        let errors: Vec<String> = images
            .iter()
            .chain(audio.iter())
            .filter(|r| r.is_failed())
            .inspect(|r| logger.asset_failed(r))
            .map(|r| {
                format!(
                    "Scene {} {}: {}",
                    r.scene_number,
                    r.kind,
                    r.error_message.as_deref().unwrap_or_default()
                )
            })
            .collect();

        let progress = ledger.snapshot().await;
        if !progress.is_settled() {
            warn!(video_id = %video_id, ?progress, "Asset counters do not cover every scene");
        }
        let status = aggregate_status(&progress);

        self.store
            .save_asset_outcome(video_id, &AssetRunOutcome::new(status, &errors))
            .await?;

        logger.assets_settled(status, errors.len());

        Ok(AssetRunReport {
            images,
            audio,
            errors,
            progress,
            status,
        })
    }

    /// Run [`Self::generate_all_assets`] as a detached task.
    ///
    /// Pollers observe completion through the persisted outcome; an error that
    /// escapes the run is persisted as a `FAILED` outcome.
    pub fn spawn_generate_all_assets(self: &Arc<Self>, video_id: VideoId) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let logger = JobLogger::new(&video_id, PipelineJob::GenerateAssets);
        let span = logger.span();

        tokio::spawn(
            async move {
                if let Err(e) = this.generate_all_assets(&video_id).await {
                    logger.failed(&e);
                    let outcome = AssetRunOutcome::new(AssetRunStatus::Failed, &[e.to_string()]);
                    if let Err(persist) = this.store.save_asset_outcome(&video_id, &outcome).await {
                        error!(error = %persist, "Failed to persist asset failure");
                    }
                }
            }
            .instrument(span),
        )
    }

    /// Delete the stored objects behind a video's successful asset records.
    pub async fn purge_assets(&self, video_id: &VideoId) -> WorkerResult<u32> {
        let records = self.store.list_assets(video_id).await?;

        let mut keys: Vec<String> = records
            .iter()
            .filter(|r| r.is_usable())
            .filter_map(|r| r.storage_key.clone())
            .collect();
        keys.sort();
        keys.dedup();

        let deleted = self.objects.delete(&keys).await?;
        JobLogger::new(video_id, PipelineJob::PurgeAssets)
            .finished(&format!("deleted {} objects", deleted));
        Ok(deleted)
    }

    async fn generate_scene_image(
        &self,
        plan: &VideoPlan,
        scene: &Scene,
        size: GenerationSize,
        ledger: &ProgressLedger<'_>,
    ) -> AssetRecord {
        let video_id = &plan.video_id;
        let n = scene.scene_number;

        let record = match self.adapter.generate_image(&scene.image_prompt, size).await {
            Ok(outcome) => {
                let key = keys::image_key(video_id, n);
                let byte_size = outcome.image.bytes.len() as u64;
                let model = outcome.image.model_id.clone();
                let metadata = HashMap::from([
                    ("video-id".to_string(), video_id.to_string()),
                    ("scene".to_string(), n.to_string()),
                    ("sanitization-level".to_string(), outcome.level.as_u8().to_string()),
                ]);

                match self
                    .objects
                    .upload(outcome.image.bytes, &key, keys::CONTENT_TYPE_PNG, metadata)
                    .await
                {
                    Ok(url) => AssetRecord::succeeded(
                        video_id.clone(),
                        AssetKind::Image,
                        n,
                        outcome.prompt_used,
                        StoredAsset {
                            storage_key: key,
                            storage_url: url,
                            byte_size,
                            mime_type: keys::CONTENT_TYPE_PNG.to_string(),
                            model_identifier: model,
                        },
                    ),
                    Err(e) => AssetRecord::failed(
                        video_id.clone(),
                        AssetKind::Image,
                        n,
                        &scene.image_prompt,
                        format!("upload failed: {}", e),
                    ),
                }
            }
            Err(e) => AssetRecord::failed(
                video_id.clone(),
                AssetKind::Image,
                n,
                &scene.image_prompt,
                e.to_string(),
            ),
        };

        self.persist(&record).await;
        ledger.record(AssetKind::Image, !record.is_failed()).await;
        record
    }

    /// `None` when the scene has no narration (counted as completed).
    async fn generate_scene_audio(
        &self,
        plan: &VideoPlan,
        scene: &Scene,
        ledger: &ProgressLedger<'_>,
    ) -> Option<AssetRecord> {
        let video_id = &plan.video_id;
        let n = scene.scene_number;

        if !scene.has_narration() {
            debug!(video_id = %video_id, scene = n, "No narration, skipping audio");
            ledger.record(AssetKind::Audio, true).await;
            return None;
        }

        let record = match self.adapter.generate_speech(&scene.narration, &plan.voice).await {
            Ok(outcome) => {
                let key = keys::audio_key(video_id, n);
                let byte_size = outcome.speech.bytes.len() as u64;
                let model = outcome.speech.model_id.clone();
                let metadata = HashMap::from([
                    ("video-id".to_string(), video_id.to_string()),
                    ("scene".to_string(), n.to_string()),
                    ("voice".to_string(), outcome.voice_id.to_string()),
                ]);

                match self
                    .objects
                    .upload(outcome.speech.bytes, &key, keys::CONTENT_TYPE_MP3, metadata)
                    .await
                {
                    Ok(url) => AssetRecord::succeeded(
                        video_id.clone(),
                        AssetKind::Audio,
                        n,
                        &scene.narration,
                        StoredAsset {
                            storage_key: key,
                            storage_url: url,
                            byte_size,
                            mime_type: keys::CONTENT_TYPE_MP3.to_string(),
                            model_identifier: model,
                        },
                    ),
                    Err(e) => AssetRecord::failed(
                        video_id.clone(),
                        AssetKind::Audio,
                        n,
                        &scene.narration,
                        format!("upload failed: {}", e),
                    ),
                }
            }
            Err(e) => AssetRecord::failed(
                video_id.clone(),
                AssetKind::Audio,
                n,
                &scene.narration,
                e.to_string(),
            ),
        };

        self.persist(&record).await;
        ledger.record(AssetKind::Audio, !record.is_failed()).await;
        Some(record)
    }

    async fn persist(&self, record: &AssetRecord) {
        if let Err(e) = self.store.save_asset(record).await {
            error!(
                video_id = %record.video_id,
                scene = record.scene_number,
                kind = %record.kind,
                error = %e,
                "Failed to persist asset record"
            );
        }
    }
}
