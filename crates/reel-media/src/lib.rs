//! FFmpeg CLI wrapper for the scene render engine.
//!
//! This crate provides:
//! - Multi-input FFmpeg command building and a runner with wall-clock limits
//! - Progress parsing from `-progress pipe:2` and stderr tail capture
//! - Duration probing with a soft-fail default
//! - Ken Burns pan/zoom effects, scene clips, concatenation and thumbnails
//! - The [`MediaTransform`] trait the pipeline depends on

pub mod clip;
pub mod command;
pub mod concat;
pub mod effects;
pub mod error;
pub mod gateway;
pub mod probe;
pub mod progress;
pub mod thumbnail;

pub use clip::{render_scene_clip, ClipEncoding};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::{build_manifest, concatenate_clips};
pub use effects::VisualEffect;
pub use error::{MediaError, MediaResult};
pub use gateway::{FfmpegTransform, MediaTransform, TransformConfig};
pub use probe::{probe_duration, probe_duration_strict, DEFAULT_PROBE_DURATION_SECS};
pub use progress::FfmpegProgress;
pub use thumbnail::{extract_thumbnail, THUMBNAIL_OFFSET_SECS};
