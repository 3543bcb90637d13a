//! In-process fakes for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reel_genai::{
    ContentFilter, GeneratedImage, GeneratedSpeech, GenerationAdapter, GenerationError,
    GenerationResult, ImageGenerator, RetryPolicy, SpeechSynthesizer,
};
use reel_media::{MediaError, MediaResult, MediaTransform, VisualEffect};
use reel_models::{
    AssetProgress, AssetRecord, AssetRunOutcome, GenerationSize, RenderOutcome, RenderProgress,
    Resolution, Scene, VideoId, VideoPlan,
};
use reel_storage::{MemoryObjectStore, ObjectStore, StorageError, StorageResult};
use reel_worker::{
    AssetOrchestrator, PipelineStore, SceneRenderer, WorkerConfig, WorkerError, WorkerResult,
};
use tempfile::TempDir;

/// Image generator that blocks prompts containing a marker word.
#[derive(Default)]
pub struct FakeImages {
    blocked_marker: Option<String>,
    always_transient: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn blocking(marker: &str) -> Self {
        Self {
            blocked_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            always_transient: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_image(
        &self,
        prompt: &str,
        _size: GenerationSize,
    ) -> GenerationResult<GeneratedImage> {
        self.calls.lock().unwrap().push(prompt.to_string());

        if self.always_transient {
            return Err(GenerationError::transient("HTTP 503: overloaded"));
        }
        if let Some(marker) = &self.blocked_marker {
            if prompt.contains(marker.as_str()) {
                return Err(GenerationError::blocked("HTTP 400: content_policy_violation"));
            }
        }

        Ok(GeneratedImage {
            bytes: format!("png:{}", prompt).into_bytes(),
            revised_prompt: None,
            model_id: "fake-image".to_string(),
        })
    }
}

/// Speech synthesizer that records `voice|text` per call.
#[derive(Default)]
pub struct FakeSpeech {
    always_transient: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            always_transient: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize_speech(
        &self,
        text: &str,
        voice_id: &str,
    ) -> GenerationResult<GeneratedSpeech> {
        self.calls.lock().unwrap().push(format!("{}|{}", voice_id, text));

        if self.always_transient {
            return Err(GenerationError::transient("HTTP 429: rate limited"));
        }

        Ok(GeneratedSpeech {
            bytes: format!("mp3:{}", text).into_bytes(),
            model_id: "fake-tts".to_string(),
        })
    }
}

/// In-memory [`PipelineStore`] with failure injection and progress histories.
#[derive(Default)]
pub struct MemoryPipelineStore {
    plans: Mutex<HashMap<String, VideoPlan>>,
    assets: Mutex<Vec<AssetRecord>>,
    asset_progress: Mutex<HashMap<String, AssetProgress>>,
    asset_progress_history: Mutex<Vec<AssetProgress>>,
    asset_outcomes: Mutex<HashMap<String, AssetRunOutcome>>,
    render_history: Mutex<Vec<RenderProgress>>,
    render_outcomes: Mutex<HashMap<String, RenderOutcome>>,
    pub fail_list_assets: AtomicBool,
}

impl MemoryPipelineStore {
    pub fn render_history(&self) -> Vec<RenderProgress> {
        self.render_history.lock().unwrap().clone()
    }

    pub fn asset_progress_history(&self) -> Vec<AssetProgress> {
        self.asset_progress_history.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<AssetRecord> {
        self.assets.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn save_plan(&self, plan: &VideoPlan) -> WorkerResult<()> {
        self.plans
            .lock()
            .unwrap()
            .insert(plan.video_id.to_string(), plan.clone());
        Ok(())
    }

    async fn load_plan(&self, video_id: &VideoId) -> WorkerResult<Option<VideoPlan>> {
        Ok(self.plans.lock().unwrap().get(video_id.as_str()).cloned())
    }

    async fn save_asset(&self, record: &AssetRecord) -> WorkerResult<()> {
        self.assets.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn list_assets(&self, video_id: &VideoId) -> WorkerResult<Vec<AssetRecord>> {
        if self.fail_list_assets.load(Ordering::SeqCst) {
            return Err(WorkerError::persistence("asset listing unavailable"));
        }
        Ok(self
            .assets
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.video_id == video_id)
            .cloned()
            .collect())
    }

    async fn save_asset_progress(
        &self,
        video_id: &VideoId,
        progress: &AssetProgress,
    ) -> WorkerResult<()> {
        self.asset_progress_history.lock().unwrap().push(*progress);
        self.asset_progress
            .lock()
            .unwrap()
            .insert(video_id.to_string(), *progress);
        Ok(())
    }

    async fn load_asset_progress(&self, video_id: &VideoId) -> WorkerResult<Option<AssetProgress>> {
        Ok(self.asset_progress.lock().unwrap().get(video_id.as_str()).copied())
    }

    async fn save_asset_outcome(
        &self,
        video_id: &VideoId,
        outcome: &AssetRunOutcome,
    ) -> WorkerResult<()> {
        self.asset_outcomes
            .lock()
            .unwrap()
            .insert(video_id.to_string(), outcome.clone());
        Ok(())
    }

    async fn load_asset_outcome(
        &self,
        video_id: &VideoId,
    ) -> WorkerResult<Option<AssetRunOutcome>> {
        Ok(self.asset_outcomes.lock().unwrap().get(video_id.as_str()).cloned())
    }

    async fn save_render_progress(
        &self,
        _video_id: &VideoId,
        progress: &RenderProgress,
    ) -> WorkerResult<()> {
        self.render_history.lock().unwrap().push(progress.clone());
        Ok(())
    }

    async fn load_render_progress(
        &self,
        _video_id: &VideoId,
    ) -> WorkerResult<Option<RenderProgress>> {
        Ok(self.render_history.lock().unwrap().last().cloned())
    }

    async fn save_render_outcome(
        &self,
        video_id: &VideoId,
        outcome: &RenderOutcome,
    ) -> WorkerResult<()> {
        self.render_outcomes
            .lock()
            .unwrap()
            .insert(video_id.to_string(), outcome.clone());
        Ok(())
    }

    async fn load_render_outcome(&self, video_id: &VideoId) -> WorkerResult<Option<RenderOutcome>> {
        Ok(self.render_outcomes.lock().unwrap().get(video_id.as_str()).cloned())
    }
}

/// Object store whose uploads fail for keys with a given suffix.
#[derive(Default)]
pub struct FlakyObjects {
    pub inner: MemoryObjectStore,
    fail_upload_suffix: Mutex<Option<String>>,
}

impl FlakyObjects {
    pub fn fail_uploads_ending_with(&self, suffix: &str) {
        *self.fail_upload_suffix.lock().unwrap() = Some(suffix.to_string());
    }
}

#[async_trait]
impl ObjectStore for FlakyObjects {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> StorageResult<String> {
        if let Some(suffix) = self.fail_upload_suffix.lock().unwrap().as_deref() {
            if key.ends_with(suffix) {
                return Err(StorageError::UploadFailed(format!("injected failure for {}", key)));
            }
        }
        self.inner.upload(bytes, key, content_type, metadata).await
    }

    async fn download_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        self.inner.download_url(key, ttl).await
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.download(key).await
    }

    async fn delete(&self, keys: &[String]) -> StorageResult<u32> {
        self.inner.delete(keys).await
    }
}

/// Media transform that writes small marker files instead of encoding.
#[derive(Default)]
pub struct ScriptedMedia {
    pub fail_render: AtomicBool,
    pub fail_concat: AtomicBool,
    pub fail_thumbnail: AtomicBool,
    pub render_calls: AtomicU32,
    effects: Mutex<Vec<VisualEffect>>,
    resolutions: Mutex<Vec<Resolution>>,
    reported_seconds: Mutex<Option<f64>>,
}

impl ScriptedMedia {
    pub fn with_duration(seconds: f64) -> Self {
        let media = Self::default();
        *media.reported_seconds.lock().unwrap() = Some(seconds);
        media
    }

    pub fn effects(&self) -> Vec<VisualEffect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn resolutions(&self) -> Vec<Resolution> {
        self.resolutions.lock().unwrap().clone()
    }

    fn failure(stage: &str) -> MediaError {
        MediaError::transform_failed(Some(1), format!("injected {} failure", stage))
    }
}

#[async_trait]
impl MediaTransform for ScriptedMedia {
    async fn probe_duration(&self, _path: &Path) -> f64 {
        self.reported_seconds
            .lock()
            .unwrap()
            .unwrap_or(reel_media::DEFAULT_PROBE_DURATION_SECS)
    }

    async fn render_scene_clip(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        resolution: Resolution,
        effect: VisualEffect,
    ) -> MediaResult<()> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        self.effects.lock().unwrap().push(effect);
        self.resolutions.lock().unwrap().push(resolution);

        if self.fail_render.load(Ordering::SeqCst) {
            return Err(Self::failure("render"));
        }

        let mut clip = tokio::fs::read(image).await?;
        clip.extend(tokio::fs::read(audio).await?);
        clip.push(b'\n');
        tokio::fs::write(output, clip).await?;
        Ok(())
    }

    async fn concatenate_clips(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        if self.fail_concat.load(Ordering::SeqCst) {
            return Err(Self::failure("concat"));
        }

        let mut joined = Vec::new();
        for clip in clips {
            joined.extend(tokio::fs::read(clip).await?);
        }
        tokio::fs::write(output, joined).await?;
        Ok(())
    }

    async fn extract_thumbnail(&self, _video: &Path, output: &Path) -> MediaResult<()> {
        if self.fail_thumbnail.load(Ordering::SeqCst) {
            return Err(Self::failure("thumbnail"));
        }
        tokio::fs::write(output, b"jpeg").await?;
        Ok(())
    }
}

/// Everything a pipeline test needs, wired together.
pub struct Harness {
    pub images: Arc<FakeImages>,
    pub speech: Arc<FakeSpeech>,
    pub objects: Arc<FlakyObjects>,
    pub store: Arc<MemoryPipelineStore>,
    pub media: Arc<ScriptedMedia>,
    pub orchestrator: Arc<AssetOrchestrator>,
    pub renderer: SceneRenderer,
    pub work_root: TempDir,
}

impl Harness {
    pub fn new(images: FakeImages, speech: FakeSpeech, media: ScriptedMedia) -> Self {
        let images = Arc::new(images);
        let speech = Arc::new(speech);
        let objects = Arc::new(FlakyObjects::default());
        let store = Arc::new(MemoryPipelineStore::default());
        let media = Arc::new(media);
        let work_root = tempfile::tempdir().unwrap();

        let config = WorkerConfig::default().with_work_dir(work_root.path().join("work"));
        let adapter = GenerationAdapter::new(
            images.clone(),
            speech.clone(),
            ContentFilter::default(),
            RetryPolicy::new(3, Duration::from_millis(1)),
        );

        let orchestrator = Arc::new(AssetOrchestrator::new(
            adapter,
            objects.clone(),
            store.clone(),
            config.clone(),
        ));
        let renderer = SceneRenderer::new(store.clone(), objects.clone(), media.clone(), config);

        Self {
            images,
            speech,
            objects,
            store,
            media,
            orchestrator,
            renderer,
            work_root,
        }
    }

    pub fn healthy() -> Self {
        Self::new(FakeImages::ok(), FakeSpeech::ok(), ScriptedMedia::with_duration(12.4))
    }

    pub async fn with_plan(self, plan: &VideoPlan) -> Self {
        self.store.save_plan(plan).await.unwrap();
        self
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_root.path().join("work")
    }

    /// Entries left under the workspace root; the root itself may not exist.
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Plan whose scenes all have an image prompt and narration.
pub fn narrated_plan(video_id: &str, scenes: u32) -> VideoPlan {
    VideoPlan::new(
        VideoId::from_string(video_id),
        (1..=scenes)
            .map(|n| Scene::new(n, format!("skyline view {}", n), format!("narration {}", n)))
            .collect(),
    )
}
