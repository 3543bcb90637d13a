//! FFprobe duration probing.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use crate::command::{check_ffprobe, StderrTail, STDERR_TAIL_LINES};
use crate::error::{MediaError, MediaResult};

/// Duration reported when probing fails.
pub const DEFAULT_PROBE_DURATION_SECS: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file's container duration in seconds.
pub async fn probe_duration_strict(path: impl AsRef<Path>, timeout: Duration) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let child = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| MediaError::Timeout(timeout.as_secs()))??;

    if !output.status.success() {
        let mut tail = StderrTail::new(STDERR_TAIL_LINES);
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tail.push(line);
        }
        return Err(MediaError::transform_failed(output.status.code(), tail.joined()));
    }

    parse_duration(&output.stdout)
}

/// Probe a duration, falling back to [`DEFAULT_PROBE_DURATION_SECS`] on any failure.
///
/// Duration is advisory, so callers never see a probe error.
pub async fn probe_duration(path: impl AsRef<Path>, timeout: Duration) -> f64 {
    let path = path.as_ref();
    match probe_duration_strict(path, timeout).await {
        Ok(secs) => secs,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                default_secs = DEFAULT_PROBE_DURATION_SECS,
                "Duration probe failed, using default"
            );
            DEFAULT_PROBE_DURATION_SECS
        }
    }
}

fn parse_duration(stdout: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;
    let raw = probe
        .format
        .duration
        .ok_or_else(|| MediaError::ProbeParse("missing format.duration".to_string()))?;

    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| MediaError::ProbeParse(format!("invalid duration '{}'", raw)))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(MediaError::ProbeParse(format!("invalid duration '{}'", raw)));
    }

    Ok(secs)
}
