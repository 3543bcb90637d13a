//! Thumbnail extraction.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Offset of the thumbnail frame, in seconds.
pub const THUMBNAIL_OFFSET_SECS: f64 = 1.0;

pub fn build_thumbnail_command(video: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .seek(THUMBNAIL_OFFSET_SECS)
        .input(video)
        .single_frame()
        .output_args(["-q:v", "2"])
}

/// Grab one frame at [`THUMBNAIL_OFFSET_SECS`].
pub async fn extract_thumbnail(
    runner: &FfmpegRunner,
    video: &Path,
    output: &Path,
) -> MediaResult<()> {
    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    runner.run(&build_thumbnail_command(video, output)).await?;

    // FFmpeg exits cleanly without writing a frame when the seek lands past the end.
    if !output.exists() {
        return Err(MediaError::transform_failed(
            Some(0),
            format!("no frame available at {}s", THUMBNAIL_OFFSET_SECS),
        ));
    }

    Ok(())
}
