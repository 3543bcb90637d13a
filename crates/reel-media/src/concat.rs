//! Lossless concatenation of scene clips.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Name of the concat demuxer manifest written next to the output.
pub const MANIFEST_FILE_NAME: &str = "concat_list.txt";

/// Render one manifest entry.
///
/// Backslashes become forward slashes and single quotes are closed, escaped
/// and reopened, so a path can never terminate its own quoting.
pub fn manifest_entry(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    format!("file '{}'", normalized.replace('\'', r"'\''"))
}

/// Concat demuxer manifest listing `clips` in order.
pub fn build_manifest(clips: &[PathBuf]) -> String {
    let mut manifest = String::new();
    for clip in clips {
        manifest.push_str(&manifest_entry(clip));
        manifest.push('\n');
    }
    manifest
}

/// Concatenate clips into `output` in the given order.
///
/// A single clip is copied byte for byte; several clips go through the concat
/// demuxer with stream copy.
pub async fn concatenate_clips(
    runner: &FfmpegRunner,
    clips: &[PathBuf],
    output: &Path,
) -> MediaResult<()> {
    match clips {
        [] => Err(MediaError::invalid_input("no clips to concatenate")),
        [only] => {
            info!(clip = %only.display(), output = %output.display(), "Single clip, copying");
            tokio::fs::copy(only, output).await?;
            Ok(())
        }
        _ => {
            if let Some(bad) = clips
                .iter()
                .find(|c| c.to_string_lossy().contains(['\n', '\r']))
            {
                return Err(MediaError::invalid_input(format!(
                    "clip path contains a line break: {:?}",
                    bad
                )));
            }

            let manifest_path = output
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(MANIFEST_FILE_NAME);
            tokio::fs::write(&manifest_path, build_manifest(clips)).await?;

            info!(clips = clips.len(), output = %output.display(), "Concatenating clips");

            let cmd = FfmpegCommand::new(output)
                .input_arg("-f")
                .input_arg("concat")
                .input_arg("-safe")
                .input_arg("0")
                .input(&manifest_path)
                .stream_copy()
                .faststart();

            let result = runner.run(&cmd).await;
            let _ = tokio::fs::remove_file(&manifest_path).await;
            result
        }
    }
}
