//! Scratch directory for one render attempt.

use std::path::{Path, PathBuf};

use reel_models::VideoId;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};

/// Exclusive scratch directory for one render attempt.
///
/// The directory is removed by [`RenderWorkspace::close`], or on drop if the
/// attempt unwinds before reaching it.
#[derive(Debug)]
pub struct RenderWorkspace {
    dir: TempDir,
}

impl RenderWorkspace {
    /// Create a fresh, uniquely named directory under `root`.
    pub async fn create(root: &Path, video_id: &VideoId) -> WorkerResult<Self> {
        tokio::fs::create_dir_all(root).await.map_err(|e| {
            WorkerError::workspace(format!("failed to create {}: {}", root.display(), e))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("render-{}-", video_id))
            .tempdir_in(root)
            .map_err(|e| {
                WorkerError::workspace(format!(
                    "failed to create workspace in {}: {}",
                    root.display(),
                    e
                ))
            })?;

        debug!(video_id = %video_id, path = %dir.path().display(), "Created render workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn image_path(&self, scene_number: u32) -> PathBuf {
        self.path().join(format!("scene_{:03}.png", scene_number))
    }

    pub fn audio_path(&self, scene_number: u32) -> PathBuf {
        self.path().join(format!("scene_{:03}.mp3", scene_number))
    }

    pub fn clip_path(&self, scene_number: u32) -> PathBuf {
        self.path().join(format!("clip_{:03}.mp4", scene_number))
    }

    pub fn final_video_path(&self) -> PathBuf {
        self.path().join("final.mp4")
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.path().join("thumbnail.jpg")
    }

    /// Delete the directory and everything in it.
    pub fn close(self) -> WorkerResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            WorkerError::workspace(format!("failed to remove {}: {}", path.display(), e))
        })
    }
}
