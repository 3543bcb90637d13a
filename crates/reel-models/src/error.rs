//! Model validation errors.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating models.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidAspectRatio(String),

    #[error("Video plan has no scenes")]
    EmptyPlan,

    #[error("Scene numbers must be positive, got {0}")]
    InvalidSceneNumber(i64),

    #[error("Duplicate scene number: {0}")]
    DuplicateScene(u32),

    #[error("Unknown render stage: {0}")]
    UnknownStage(String),
}
