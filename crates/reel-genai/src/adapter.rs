//! Retry and content-policy escalation around the raw generation services.

use std::sync::Arc;
use std::time::Duration;

use reel_models::GenerationSize;
use tracing::{debug, info, warn};

use crate::client::GenAiConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::provider::{ImageGenerator, SpeechSynthesizer};
use crate::sanitize::{ContentFilter, SanitizationLevel};
use crate::types::{GeneratedImage, GeneratedSpeech};
use crate::voice::resolve_voice;

/// Attempt budget shared by the escalation and backoff branches.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Linear backoff unit for transient failures
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    pub fn from_config(config: &GenAiConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

/// A successfully generated image and how it was obtained.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub image: GeneratedImage,
    /// Prompt that the provider accepted
    pub prompt_used: String,
    pub level: SanitizationLevel,
    pub attempts: u32,
}

/// Successfully synthesized narration.
#[derive(Debug, Clone)]
pub struct SpeechOutcome {
    pub speech: GeneratedSpeech,
    /// Provider voice the key resolved to
    pub voice_id: &'static str,
    pub attempts: u32,
}

/// Typed generation calls with the retry and sanitization policy applied.
#[derive(Clone)]
pub struct GenerationAdapter {
    images: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    filter: ContentFilter,
    policy: RetryPolicy,
}

impl GenerationAdapter {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        filter: ContentFilter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            images,
            speech,
            filter,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    /// Generate an image, escalating sanitization on content-policy blocks.
    ///
    /// A block moves one sanitization level up and retries immediately; a
    /// transient failure retries the current prompt after `attempt × delay`.
    /// Both draw from the same attempt budget.
    pub async fn generate_image(
        &self,
        prompt: &str,
        size: GenerationSize,
    ) -> GenerationResult<ImageOutcome> {
        let max_attempts = self.policy.max_attempts();
        let mut level = SanitizationLevel::Original;
        let mut last_error: Option<GenerationError> = None;

        for attempt in 1..=max_attempts {
            let current = self.filter.sanitize(prompt, level);

            match self.images.generate_image(&current, size).await {
                Ok(image) => {
                    if level != SanitizationLevel::Original {
                        info!(%level, attempt, "Image accepted after prompt sanitization");
                    }
                    return Ok(ImageOutcome {
                        image,
                        prompt_used: current,
                        level,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_blocked() => {
                    let next = level.escalate().unwrap_or(level);
                    warn!(
                        attempt,
                        from = %level,
                        to = %next,
                        error = %e,
                        "Image prompt blocked, escalating sanitization"
                    );
                    level = next;
                    last_error = Some(e);
                }
                Err(e) if e.is_retryable() => {
                    if attempt < max_attempts {
                        let delay = self.policy.backoff(attempt);
                        warn!(attempt, ?delay, error = %e, "Image generation failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(exhausted(max_attempts, last_error))
    }

    /// Synthesize narration for a semantic voice key.
    ///
    /// Only transient failures are retried; the text is never rewritten.
    pub async fn generate_speech(
        &self,
        text: &str,
        voice_key: &str,
    ) -> GenerationResult<SpeechOutcome> {
        let voice_id = resolve_voice(voice_key);
        let max_attempts = self.policy.max_attempts();
        let mut last_error: Option<GenerationError> = None;

        debug!(voice_key, voice_id, "Synthesizing narration");

        for attempt in 1..=max_attempts {
            match self.speech.synthesize_speech(text, voice_id).await {
                Ok(speech) => {
                    return Ok(SpeechOutcome {
                        speech,
                        voice_id,
                        attempts: attempt,
                    })
                }
                Err(e) if e.is_retryable() => {
                    if attempt < max_attempts {
                        let delay = self.policy.backoff(attempt);
                        warn!(attempt, ?delay, error = %e, "Speech synthesis failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(exhausted(max_attempts, last_error))
    }
}

fn exhausted(attempts: u32, last_error: Option<GenerationError>) -> GenerationError {
    GenerationError::RetriesExhausted {
        attempts,
        last_error: last_error
            .map(|e| e.detail())
            .unwrap_or_else(|| "no attempts made".to_string()),
    }
}
