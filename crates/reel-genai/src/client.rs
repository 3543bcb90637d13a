//! HTTP client for an OpenAI-compatible generation service.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reel_models::GenerationSize;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::error::{GenerationError, GenerationResult};
use crate::provider::{ImageGenerator, SpeechSynthesizer};
use crate::types::{
    ApiErrorBody, GeneratedImage, GeneratedSpeech, ImageRequest, ImageResponse, SpeechRequest,
};

/// Configuration for the generation client.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Base URL of the API (without trailing slash)
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Image model identifier
    pub image_model: String,
    /// Speech model identifier
    pub speech_model: String,
    /// Request timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Linear backoff unit for transient failures
    pub retry_delay: Duration,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            image_model: "dall-e-3".to_string(),
            speech_model: "tts-1-hd".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

impl GenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GenerationResult<Self> {
        let defaults = Self::default();

        let api_key = std::env::var("GENAI_API_KEY")
            .map_err(|_| GenerationError::config_error("GENAI_API_KEY not set"))?;
        if api_key.trim().is_empty() {
            return Err(GenerationError::config_error("GENAI_API_KEY cannot be empty"));
        }

        Ok(Self {
            base_url: std::env::var("GENAI_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key,
            image_model: std::env::var("GENAI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            speech_model: std::env::var("GENAI_SPEECH_MODEL").unwrap_or(defaults.speech_model),
            timeout: Duration::from_secs(
                std::env::var("GENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_retries: std::env::var("GENAI_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: Duration::from_millis(
                std::env::var("GENAI_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
        })
    }
}

/// Client for the generation service.
#[derive(Clone)]
pub struct GenAiClient {
    http: Client,
    config: GenAiConfig,
}

impl GenAiClient {
    /// Create a new client.
    pub fn new(config: GenAiConfig) -> GenerationResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("reel-genai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GenerationError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> GenerationResult<Self> {
        Self::new(GenAiConfig::from_env()?)
    }

    pub fn config(&self) -> &GenAiConfig {
        &self.config
    }

    /// Turn a non-success response into a classified error.
    async fn error_from_response(response: Response) -> GenerationError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        // Prefer the structured code when the provider sends one.
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(&body) {
            if parsed.error.code.as_deref() == Some("content_policy_violation") {
                return GenerationError::blocked(parsed.error.message);
            }
        }

        GenerationError::from_http_status(status, &body)
    }

    async fn fetch_image_url(&self, url: &str) -> GenerationResult<Vec<u8>> {
        let response = self.http.get(url).send().await.map_err(classify_network)?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let bytes = response.bytes().await.map_err(classify_network)?;
        Ok(bytes.to_vec())
    }
}

/// Timeouts and connection failures are transient; everything else keeps its class.
fn classify_network(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() || e.is_connect() {
        GenerationError::transient(e.to_string())
    } else {
        GenerationError::Network(e)
    }
}

#[async_trait]
impl ImageGenerator for GenAiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        size: GenerationSize,
    ) -> GenerationResult<GeneratedImage> {
        let url = format!("{}/images/generations", self.config.base_url);
        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: size.as_dimensions(),
            quality: "standard",
            response_format: "b64_json",
        };

        debug!(model = %self.config.image_model, size = %size, "Requesting image generation");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_network)?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!(error = %err, "Image generation request failed");
            return Err(err);
        }

        let body: ImageResponse = response.json().await.map_err(classify_network)?;
        let data = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::fatal("Image response contained no data"))?;

        let bytes = match (data.b64_json.as_deref(), data.url.as_deref()) {
            (Some(b64), _) => BASE64
                .decode(b64)
                .map_err(|e| {
                    GenerationError::fatal(format!("Invalid base64 image payload: {}", e))
                })?,
            (None, Some(image_url)) => self.fetch_image_url(image_url).await?,
            (None, None) => {
                return Err(GenerationError::fatal(
                    "Image response had neither data nor URL",
                ))
            }
        };

        if bytes.is_empty() {
            return Err(GenerationError::fatal("Image payload was empty"));
        }

        Ok(GeneratedImage {
            bytes,
            revised_prompt: data.revised_prompt,
            model_id: self.config.image_model.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GenAiClient {
    async fn synthesize_speech(
        &self,
        text: &str,
        voice_id: &str,
    ) -> GenerationResult<GeneratedSpeech> {
        let url = format!("{}/audio/speech", self.config.base_url);
        let request = SpeechRequest {
            model: &self.config.speech_model,
            input: text,
            voice: voice_id,
            response_format: "mp3",
        };

        debug!(
            model = %self.config.speech_model,
            voice = voice_id,
            chars = text.len(),
            "Requesting speech synthesis"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_network)?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!(error = %err, "Speech synthesis request failed");
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(classify_network)?.to_vec();
        if bytes.is_empty() {
            return Err(GenerationError::fatal("Speech payload was empty"));
        }

        Ok(GeneratedSpeech {
            bytes,
            model_id: self.config.speech_model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GenAiClient {
        GenAiClient::new(GenAiConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = GenAiConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.retry_delay, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_generate_image_decodes_b64() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(
                serde_json::json!({"size": "1792x1024", "prompt": "a lighthouse"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "b64_json": BASE64.encode(b"PNGDATA"),
                    "revised_prompt": "a tall lighthouse"
                }]
            })))
            .mount(&server)
            .await;

        let image = client_for(&server)
            .generate_image("a lighthouse", GenerationSize::Wide)
            .await
            .unwrap();

        assert_eq!(image.bytes, b"PNGDATA");
        assert_eq!(image.revised_prompt.as_deref(), Some("a tall lighthouse"));
        assert_eq!(image.model_id, "dall-e-3");
    }

    #[tokio::test]
    async fn test_generate_image_content_policy_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "content_policy_violation",
                    "message": "Your request was rejected"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_image("something", GenerationSize::Square)
            .await
            .unwrap_err();

        assert!(err.is_blocked());
    }

    #[tokio::test]
    async fn test_generate_image_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_image("something", GenerationSize::Square)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_synthesize_speech_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_partial_json(serde_json::json!({"voice": "onyx", "input": "Hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .mount(&server)
            .await;

        let speech = client_for(&server).synthesize_speech("Hello", "onyx").await.unwrap();
        assert_eq!(speech.bytes, b"ID3audio");
        assert_eq!(speech.model_id, "tts-1-hd");
    }
}
