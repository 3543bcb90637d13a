//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving FFmpeg/FFprobe.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    /// The executable exited unsuccessfully.
    #[error("Media transform failed (exit code {}): {stderr_tail}", display_code(.exit_code))]
    TransformFailed {
        exit_code: Option<i32>,
        /// Last non-progress stderr lines
        stderr_tail: String,
    },

    #[error("Probe output could not be parsed: {0}")]
    ProbeParse(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    pub fn transform_failed(exit_code: Option<i32>, stderr_tail: impl Into<String>) -> Self {
        Self::TransformFailed {
            exit_code,
            stderr_tail: stderr_tail.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, MediaError::Timeout(_))
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}
