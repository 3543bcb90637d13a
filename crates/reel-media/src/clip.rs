//! Rendering one scene (still image + narration) into a video clip.

use std::path::Path;

use reel_models::Resolution;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::effects::VisualEffect;
use crate::error::{MediaError, MediaResult};

/// Encoding settings shared by every scene clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEncoding {
    pub fps: u32,
    pub crf: u8,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for ClipEncoding {
    fn default() -> Self {
        Self {
            fps: 30,
            crf: 23,
            preset: "medium".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Build the command compositing a looped image with an audio track.
///
/// The image input loops forever, so `-shortest` ends the clip with the audio.
pub fn build_scene_clip_command(
    image: &Path,
    audio: &Path,
    output: &Path,
    resolution: Resolution,
    effect: VisualEffect,
    encoding: &ClipEncoding,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input_arg("-loop")
        .input_arg("1")
        .input_arg("-framerate")
        .input_arg(encoding.fps.to_string())
        .input(image)
        .input(audio)
        .map("0:v:0")
        .map("1:a:0")
        .video_filter(effect.filter(resolution, encoding.fps))
        .video_codec("libx264")
        .preset(encoding.preset.clone())
        .crf(encoding.crf)
        .pixel_format("yuv420p")
        .frame_rate(encoding.fps)
        .audio_codec(encoding.audio_codec.clone())
        .audio_bitrate(encoding.audio_bitrate.clone())
        .shortest()
        .faststart()
}

/// Render one scene clip.
pub async fn render_scene_clip(
    runner: &FfmpegRunner,
    image: &Path,
    audio: &Path,
    output: &Path,
    resolution: Resolution,
    effect: VisualEffect,
    encoding: &ClipEncoding,
) -> MediaResult<()> {
    for input in [image, audio] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
    }

    info!(
        output = %output.display(),
        %effect,
        %resolution,
        "Rendering scene clip"
    );

    let cmd = build_scene_clip_command(image, audio, output, resolution, effect, encoding);
    runner
        .run_with_progress(&cmd, |progress| {
            if progress.is_complete {
                debug!(
                    frames = progress.frame,
                    secs = progress.out_time_secs(),
                    speed = progress.speed,
                    "Scene clip encoded"
                );
            }
        })
        .await
}
