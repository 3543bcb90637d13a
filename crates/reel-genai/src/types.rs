//! Provider request/response types.

use serde::{Deserialize, Serialize};

/// Image generation request.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub size: &'a str,
    pub quality: &'a str,
    pub response_format: &'a str,
}

/// Image generation response.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

/// Text-to-speech request.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'a str,
}

/// Error envelope returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// A generated still image.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// Prompt as rewritten by the provider, when it reports one
    pub revised_prompt: Option<String>,
    pub model_id: String,
}

/// Synthesized narration audio.
#[derive(Debug, Clone)]
pub struct GeneratedSpeech {
    pub bytes: Vec<u8>,
    pub model_id: String,
}
