//! Generated asset records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoId;

/// Kind of generated asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted result of generating one scene's image or audio.
///
/// Records are append-only. A record with an error message is a failed
/// asset and never carries a storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetRecord {
    pub video_id: VideoId,
    pub kind: AssetKind,
    pub scene_number: u32,
    /// Prompt (image) or narration text (audio) actually sent to the provider
    pub source_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(default)]
    pub byte_size: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub model_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a successfully stored asset.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub storage_key: String,
    pub storage_url: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub model_identifier: String,
}

impl AssetRecord {
    /// Record for an asset that was generated and uploaded.
    pub fn succeeded(
        video_id: VideoId,
        kind: AssetKind,
        scene_number: u32,
        source_prompt: impl Into<String>,
        stored: StoredAsset,
    ) -> Self {
        Self {
            video_id,
            kind,
            scene_number,
            source_prompt: source_prompt.into(),
            storage_key: Some(stored.storage_key),
            storage_url: Some(stored.storage_url),
            byte_size: stored.byte_size,
            mime_type: stored.mime_type,
            model_identifier: stored.model_identifier,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Record for an asset whose generation or upload failed.
    pub fn failed(
        video_id: VideoId,
        kind: AssetKind,
        scene_number: u32,
        source_prompt: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = "unknown error".to_string();
        }

        Self {
            video_id,
            kind,
            scene_number,
            source_prompt: source_prompt.into(),
            storage_key: None,
            storage_url: None,
            byte_size: 0,
            mime_type: String::new(),
            model_identifier: String::new(),
            error_message: Some(error_message),
            created_at: Utc::now(),
        }
    }

    /// Whether this record is a failure.
    pub fn is_failed(&self) -> bool {
        self.error_message
            .as_deref()
            .map(|m| !m.is_empty())
            .unwrap_or(false)
    }

    /// Usable for rendering: no error and a non-empty storage key.
    pub fn is_usable(&self) -> bool {
        !self.is_failed()
            && self
                .storage_key
                .as_deref()
                .map(|k| !k.is_empty())
                .unwrap_or(false)
    }
}

/// Run-level classification of an asset generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetRunStatus {
    Completed,
    Partial,
    Failed,
}

impl AssetRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRunStatus::Completed => "COMPLETED",
            AssetRunStatus::Partial => "PARTIAL",
            AssetRunStatus::Failed => "FAILED",
        }
    }

    /// Whether a render may start from assets in this state.
    pub fn is_usable(&self) -> bool {
        matches!(self, AssetRunStatus::Completed | AssetRunStatus::Partial)
    }
}

impl fmt::Display for AssetRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of an asset generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetRunOutcome {
    pub status: AssetRunStatus,
    /// All per-scene error strings joined together
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl AssetRunOutcome {
    pub fn new(status: AssetRunStatus, errors: &[String]) -> Self {
        Self {
            status,
            error_message: join_errors(errors),
            finished_at: Utc::now(),
        }
    }
}

/// Join per-scene error strings into one human-readable message.
pub fn join_errors(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> StoredAsset {
        StoredAsset {
            storage_key: "videos/v1/images/scene_001.png".to_string(),
            storage_url: "https://cdn.example.com/videos/v1/images/scene_001.png".to_string(),
            byte_size: 42,
            mime_type: "image/png".to_string(),
            model_identifier: "dall-e-3".to_string(),
        }
    }

    #[test]
    fn test_succeeded_record_is_usable() {
        let record =
            AssetRecord::succeeded(VideoId::from("v1"), AssetKind::Image, 1, "a cat", stored());
        assert!(record.is_usable());
        assert!(!record.is_failed());
    }

    #[test]
    fn test_failed_record_has_no_key() {
        let record =
            AssetRecord::failed(VideoId::from("v1"), AssetKind::Audio, 2, "hello", "quota");
        assert!(record.is_failed());
        assert!(!record.is_usable());
        assert!(record.storage_key.is_none());
    }

    #[test]
    fn test_failed_record_never_has_empty_message() {
        let record = AssetRecord::failed(VideoId::from("v1"), AssetKind::Image, 1, "p", "");
        assert!(record.is_failed());
    }

    #[test]
    fn test_empty_key_is_not_usable() {
        let mut s = stored();
        s.storage_key = String::new();
        let record = AssetRecord::succeeded(VideoId::from("v1"), AssetKind::Image, 1, "p", s);
        assert!(!record.is_usable());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&AssetRunStatus::Partial).unwrap(), "\"PARTIAL\"");
        assert!(AssetRunStatus::Partial.is_usable());
        assert!(!AssetRunStatus::Failed.is_usable());
    }

    #[test]
    fn test_join_errors() {
        assert_eq!(join_errors(&[]), None);
        assert_eq!(
            join_errors(&[
                "Scene 1 image: blocked".to_string(),
                "Scene 2 audio: quota".to_string()
            ]),
            Some("Scene 1 image: blocked; Scene 2 audio: quota".to_string())
        );
    }
}
