//! Generation client adapter for images and narration.
//!
//! This crate provides:
//! - An HTTP client for an OpenAI-compatible image and speech API
//! - Provider traits so the services can be swapped or faked
//! - Content-filter prompt sanitization with escalation levels
//! - The retry/escalation policy used by the asset orchestrator
//! - The semantic voice table

pub mod adapter;
pub mod client;
pub mod error;
pub mod provider;
pub mod sanitize;
pub mod types;
pub mod voice;

pub use adapter::{GenerationAdapter, ImageOutcome, RetryPolicy, SpeechOutcome};
pub use client::{GenAiClient, GenAiConfig};
pub use error::{GenerationError, GenerationResult};
pub use provider::{ImageGenerator, SpeechSynthesizer};
pub use sanitize::{ContentFilter, SanitizationLevel, TermLists, GENERIC_FALLBACK_PROMPT};
pub use types::{GeneratedImage, GeneratedSpeech};
pub use voice::{is_known_voice, known_voice_keys, resolve_voice, DEFAULT_VOICE_ID};
