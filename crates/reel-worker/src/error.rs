//! Worker error types.

use reel_models::RenderStage;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("No plan found for video {0}")]
    PlanMissing(String),

    #[error("No usable assets for video {0}")]
    NoUsableAssets(String),

    #[error("No scene clips were rendered for video {0}")]
    NoClipsRendered(String),

    #[error("Illegal render stage transition {from} -> {to}")]
    InvalidTransition { from: RenderStage, to: RenderStage },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Generation error: {0}")]
    Generation(#[from] reel_genai::GenerationError),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("Model error: {0}")]
    Model(#[from] reel_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Self::InvalidPlan(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Failed precondition; retrying without new input cannot help.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WorkerError::PlanMissing(_)
                | WorkerError::NoUsableAssets(_)
                | WorkerError::InvalidPlan(_)
                | WorkerError::Model(_)
        )
    }
}
