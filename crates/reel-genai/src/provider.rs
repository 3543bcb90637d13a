//! Provider seams for image and speech generation.

use async_trait::async_trait;
use reel_models::GenerationSize;

use crate::error::GenerationResult;
use crate::types::{GeneratedImage, GeneratedSpeech};

/// Generates one still image from a text prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(
        &self,
        prompt: &str,
        size: GenerationSize,
    ) -> GenerationResult<GeneratedImage>;
}

/// Synthesizes narration audio for a provider voice identifier.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize_speech(
        &self,
        text: &str,
        voice_id: &str,
    ) -> GenerationResult<GeneratedSpeech>;
}
