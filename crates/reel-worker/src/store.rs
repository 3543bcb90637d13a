//! Persistence of plans, asset records and progress.
//!
//! [`PipelineStore`] is the port the orchestrator and renderer write through.
//! [`JsonFileStore`] keeps one directory per video:
//!
//! ```text
//! <data_dir>/<video_id>/plan.json
//!                      /assets.jsonl
//!                      /asset_progress.json
//!                      /asset_outcome.json
//!                      /render_progress.json
//!                      /render_outcome.json
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reel_models::{
    AssetKind, AssetProgress, AssetRecord, AssetRunOutcome, RenderOutcome, RenderProgress, VideoId,
    VideoPlan,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

const PLAN_FILE: &str = "plan.json";
const ASSETS_FILE: &str = "assets.jsonl";
const ASSET_PROGRESS_FILE: &str = "asset_progress.json";
const ASSET_OUTCOME_FILE: &str = "asset_outcome.json";
const RENDER_PROGRESS_FILE: &str = "render_progress.json";
const RENDER_OUTCOME_FILE: &str = "render_outcome.json";

/// Per-video pipeline state.
///
/// Single-document writes replace the whole document; asset records are
/// append-only.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn save_plan(&self, plan: &VideoPlan) -> WorkerResult<()>;
    async fn load_plan(&self, video_id: &VideoId) -> WorkerResult<Option<VideoPlan>>;

    async fn save_asset(&self, record: &AssetRecord) -> WorkerResult<()>;
    /// All records for a video in append order.
    async fn list_assets(&self, video_id: &VideoId) -> WorkerResult<Vec<AssetRecord>>;

    async fn save_asset_progress(
        &self,
        video_id: &VideoId,
        progress: &AssetProgress,
    ) -> WorkerResult<()>;
    async fn load_asset_progress(&self, video_id: &VideoId) -> WorkerResult<Option<AssetProgress>>;

    async fn save_asset_outcome(
        &self,
        video_id: &VideoId,
        outcome: &AssetRunOutcome,
    ) -> WorkerResult<()>;
    async fn load_asset_outcome(&self, video_id: &VideoId) -> WorkerResult<Option<AssetRunOutcome>>;

    async fn save_render_progress(
        &self,
        video_id: &VideoId,
        progress: &RenderProgress,
    ) -> WorkerResult<()>;
    async fn load_render_progress(
        &self,
        video_id: &VideoId,
    ) -> WorkerResult<Option<RenderProgress>>;

    async fn save_render_outcome(
        &self,
        video_id: &VideoId,
        outcome: &RenderOutcome,
    ) -> WorkerResult<()>;
    async fn load_render_outcome(&self, video_id: &VideoId) -> WorkerResult<Option<RenderOutcome>>;
}

/// Latest record per scene for one asset kind.
///
/// Later records supersede earlier ones, so a re-run replaces an old result.
pub fn latest_by_scene(records: &[AssetRecord], kind: AssetKind) -> HashMap<u32, &AssetRecord> {
    let mut latest = HashMap::new();
    for record in records.iter().filter(|r| r.kind == kind) {
        latest.insert(record.scene_number, record);
    }
    latest
}

/// File-backed [`PipelineStore`].
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    append_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn video_dir(&self, video_id: &VideoId) -> WorkerResult<PathBuf> {
        let id = video_id.as_str();
        let safe = !id.is_empty()
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !safe {
            return Err(WorkerError::persistence(format!("invalid video id '{}'", id)));
        }
        Ok(self.root.join(id))
    }

    async fn write_json<T: Serialize + Sync>(
        &self,
        video_id: &VideoId,
        name: &str,
        value: &T,
    ) -> WorkerResult<()> {
        let dir = self.video_dir(video_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes).await?;

        // Rename is atomic on the same filesystem, so readers never see a partial document.
        if let Err(e) = tokio::fs::rename(&tmp, dir.join(name)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(video_id = %video_id, file = name, bytes = bytes.len(), "Wrote document");
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        video_id: &VideoId,
        name: &str,
    ) -> WorkerResult<Option<T>> {
        let path = self.video_dir(video_id)?.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PipelineStore for JsonFileStore {
    async fn save_plan(&self, plan: &VideoPlan) -> WorkerResult<()> {
        self.write_json(&plan.video_id, PLAN_FILE, plan).await
    }

    async fn load_plan(&self, video_id: &VideoId) -> WorkerResult<Option<VideoPlan>> {
        self.read_json(video_id, PLAN_FILE).await
    }

    async fn save_asset(&self, record: &AssetRecord) -> WorkerResult<()> {
        let dir = self.video_dir(&record.video_id)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.append_lock.lock().await;
        tokio::fs::create_dir_all(&dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(ASSETS_FILE))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list_assets(&self, video_id: &VideoId) -> WorkerResult<Vec<AssetRecord>> {
        let path = self.video_dir(video_id)?.join(ASSETS_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| {
                    WorkerError::persistence(format!("{} line {}: {}", ASSETS_FILE, n + 1, e))
                })
            })
            .collect()
    }

    async fn save_asset_progress(
        &self,
        video_id: &VideoId,
        progress: &AssetProgress,
    ) -> WorkerResult<()> {
        self.write_json(video_id, ASSET_PROGRESS_FILE, progress).await
    }

    async fn load_asset_progress(&self, video_id: &VideoId) -> WorkerResult<Option<AssetProgress>> {
        self.read_json(video_id, ASSET_PROGRESS_FILE).await
    }

    async fn save_asset_outcome(
        &self,
        video_id: &VideoId,
        outcome: &AssetRunOutcome,
    ) -> WorkerResult<()> {
        self.write_json(video_id, ASSET_OUTCOME_FILE, outcome).await
    }

    async fn load_asset_outcome(
        &self,
        video_id: &VideoId,
    ) -> WorkerResult<Option<AssetRunOutcome>> {
        self.read_json(video_id, ASSET_OUTCOME_FILE).await
    }

    async fn save_render_progress(
        &self,
        video_id: &VideoId,
        progress: &RenderProgress,
    ) -> WorkerResult<()> {
        self.write_json(video_id, RENDER_PROGRESS_FILE, progress).await
    }

    async fn load_render_progress(
        &self,
        video_id: &VideoId,
    ) -> WorkerResult<Option<RenderProgress>> {
        self.read_json(video_id, RENDER_PROGRESS_FILE).await
    }

    async fn save_render_outcome(
        &self,
        video_id: &VideoId,
        outcome: &RenderOutcome,
    ) -> WorkerResult<()> {
        self.write_json(video_id, RENDER_OUTCOME_FILE, outcome).await
    }

    async fn load_render_outcome(&self, video_id: &VideoId) -> WorkerResult<Option<RenderOutcome>> {
        self.read_json(video_id, RENDER_OUTCOME_FILE).await
    }
}
