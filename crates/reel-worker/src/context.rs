//! Wiring of the production collaborators.

use std::sync::Arc;

use reel_genai::{ContentFilter, GenAiClient, GenerationAdapter, RetryPolicy};
use reel_media::{FfmpegTransform, MediaTransform, TransformConfig};
use reel_storage::{ObjectStore, R2Client};
use tracing::info;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::orchestrator::AssetOrchestrator;
use crate::renderer::SceneRenderer;
use crate::store::{JsonFileStore, PipelineStore};

/// Shared handles for one worker process.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: Arc<dyn PipelineStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub orchestrator: Arc<AssetOrchestrator>,
    pub renderer: Arc<SceneRenderer>,
}

impl WorkerContext {
    /// Assemble a context from already-built collaborators.
    pub fn new(
        config: WorkerConfig,
        adapter: GenerationAdapter,
        objects: Arc<dyn ObjectStore>,
        store: Arc<dyn PipelineStore>,
        media: Arc<dyn MediaTransform>,
    ) -> Self {
        let orchestrator = Arc::new(AssetOrchestrator::new(
            adapter,
            Arc::clone(&objects),
            Arc::clone(&store),
            config.clone(),
        ));
        let renderer = Arc::new(SceneRenderer::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            media,
            config.clone(),
        ));

        Self {
            config,
            store,
            objects,
            orchestrator,
            renderer,
        }
    }

    /// Build the HTTP generation client, R2, the JSON store and FFmpeg from the environment.
    pub async fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let client = Arc::new(GenAiClient::from_env()?);
        let policy = RetryPolicy::from_config(client.config());
        let filter = ContentFilter::from_env()?;
        let adapter = GenerationAdapter::new(client.clone(), client, filter, policy);

        let objects: Arc<dyn ObjectStore> = Arc::new(R2Client::from_env().await?);
        let store: Arc<dyn PipelineStore> = Arc::new(JsonFileStore::new(&config.data_dir));
        let media: Arc<dyn MediaTransform> =
            Arc::new(FfmpegTransform::new(TransformConfig::from_env()));

        info!(
            work_dir = %config.work_dir.display(),
            data_dir = %config.data_dir.display(),
            max_scenes = config.max_scenes,
            "Worker context ready"
        );

        Ok(Self::new(config, adapter, objects, store, media))
    }
}
