//! The media transform seam used by the render engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reel_models::Resolution;

use crate::clip::{render_scene_clip, ClipEncoding};
use crate::command::FfmpegRunner;
use crate::concat::concatenate_clips;
use crate::effects::VisualEffect;
use crate::error::MediaResult;
use crate::probe::probe_duration;
use crate::thumbnail::extract_thumbnail;

/// The four operations the pipeline needs from a media tool.
#[async_trait]
pub trait MediaTransform: Send + Sync {
    /// Duration in seconds; never fails (falls back to a fixed default).
    async fn probe_duration(&self, path: &Path) -> f64;

    /// Composite a still image and an audio track into a clip.
    async fn render_scene_clip(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        resolution: Resolution,
        effect: VisualEffect,
    ) -> MediaResult<()>;

    /// Join clips in order without re-encoding.
    async fn concatenate_clips(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()>;

    /// Grab one frame as a still image.
    async fn extract_thumbnail(&self, video: &Path, output: &Path) -> MediaResult<()>;
}

/// FFmpeg invocation settings.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Wall-clock limit for each FFmpeg run
    pub ffmpeg_timeout: Duration,
    /// Wall-clock limit for each FFprobe run
    pub ffprobe_timeout: Duration,
    pub encoding: ClipEncoding,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            ffmpeg_timeout: Duration::from_secs(600),
            ffprobe_timeout: Duration::from_secs(30),
            encoding: ClipEncoding::default(),
        }
    }
}

impl TransformConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            ffprobe_timeout: Duration::from_secs(
                std::env::var("FFPROBE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            encoding: ClipEncoding::default(),
        }
    }
}

/// [`MediaTransform`] backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegTransform {
    config: TransformConfig,
    runner: FfmpegRunner,
}

impl Default for FfmpegTransform {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

impl FfmpegTransform {
    pub fn new(config: TransformConfig) -> Self {
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout);
        Self { config, runner }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }
}

#[async_trait]
impl MediaTransform for FfmpegTransform {
    async fn probe_duration(&self, path: &Path) -> f64 {
        probe_duration(path, self.config.ffprobe_timeout).await
    }

    async fn render_scene_clip(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        resolution: Resolution,
        effect: VisualEffect,
    ) -> MediaResult<()> {
        render_scene_clip(
            &self.runner,
            image,
            audio,
            output,
            resolution,
            effect,
            &self.config.encoding,
        )
        .await
    }

    async fn concatenate_clips(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        concatenate_clips(&self.runner, clips, output).await
    }

    async fn extract_thumbnail(&self, video: &Path, output: &Path) -> MediaResult<()> {
        extract_thumbnail(&self.runner, video, output).await
    }
}
