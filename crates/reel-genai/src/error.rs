//! Generation client error types.

use thiserror::Error;

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors returned by the generative image and speech services.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider rejected the request under its content policy.
    #[error("Generation blocked by content policy: {0}")]
    Blocked(String),

    /// Quota, rate limit, timeout or server-side failure.
    #[error("Transient generation failure: {0}")]
    Transient(String),

    #[error("Generation failed: {0}")]
    Fatal(String),

    #[error("Generation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub fn blocked(msg: impl Into<String>) -> Self {
        Self::Blocked(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Content-policy rejection, recoverable by sanitizing the prompt.
    pub fn is_blocked(&self) -> bool {
        matches!(self, GenerationError::Blocked(_))
    }

    /// Recoverable by retrying the same request after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Transient(_) | GenerationError::Network(_)
        )
    }

    /// Map an HTTP error response to an error class.
    ///
    /// Content-policy rejections arrive as 400s whose body names the policy.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let msg = format!("HTTP {}: {}", status, body.trim());
        match status {
            400 if is_content_policy_body(body) => Self::Blocked(msg),
            408 | 409 | 429 => Self::Transient(msg),
            s if s >= 500 => Self::Transient(msg),
            _ => Self::Fatal(msg),
        }
    }

    /// Message of the underlying failure, without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            GenerationError::Blocked(m)
            | GenerationError::Transient(m)
            | GenerationError::Fatal(m)
            | GenerationError::Config(m) => m.clone(),
            GenerationError::RetriesExhausted { last_error, .. } => last_error.clone(),
            other => other.to_string(),
        }
    }
}

fn is_content_policy_body(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("content_policy_violation")
        || lower.contains("content policy")
        || lower.contains("safety system")
}
