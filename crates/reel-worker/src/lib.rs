//! Asset generation and scene rendering for the media production pipeline.
//!
//! This crate provides:
//! - The asset orchestrator fanning a plan out into image and narration tasks
//! - The scene render engine producing the final video and thumbnail
//! - The pipeline persistence port and its JSON file implementation
//! - Per-render scratch workspaces and worker configuration

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod renderer;
pub mod store;
pub mod workspace;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use logging::{JobLogger, PipelineJob};
pub use orchestrator::{AssetOrchestrator, AssetRunReport};
pub use renderer::{RenderResult, SceneRenderer};
pub use store::{latest_by_scene, JsonFileStore, PipelineStore};
pub use workspace::RenderWorkspace;
