//! Video plan: the ordered scene list handed to the pipeline.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::video::{AspectRatio, VideoId};

/// Voice key that disables narration for the whole run.
pub const VOICE_NONE: &str = "none";

/// One unit of a video plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 1-based scene number, unique within the plan but not necessarily contiguous
    pub scene_number: u32,
    /// Description of the still image for this scene
    pub image_prompt: String,
    /// Narration script; may be empty
    #[serde(default)]
    pub narration: String,
}

impl Scene {
    pub fn new(
        scene_number: u32,
        image_prompt: impl Into<String>,
        narration: impl Into<String>,
    ) -> Self {
        Self {
            scene_number,
            image_prompt: image_prompt.into(),
            narration: narration.into(),
        }
    }

    /// Whether this scene has narration to synthesize.
    pub fn has_narration(&self) -> bool {
        !self.narration.trim().is_empty()
    }
}

/// Immutable plan for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoPlan {
    pub video_id: VideoId,
    /// Target aspect ratio, e.g. `16:9`
    #[serde(default)]
    #[schemars(with = "String")]
    pub aspect_ratio: AspectRatio,
    /// Semantic voice key (e.g. `authoritative_male`), or `none` to skip narration
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Scenes in render order
    pub scenes: Vec<Scene>,
}

fn default_voice() -> String {
    "neutral".to_string()
}

impl VideoPlan {
    /// Create a plan with the default voice and aspect ratio.
    pub fn new(video_id: VideoId, scenes: Vec<Scene>) -> Self {
        Self {
            video_id,
            aspect_ratio: AspectRatio::default(),
            voice: default_voice(),
            scenes,
        }
    }

    /// Set the aspect ratio.
    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set the voice key.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Number of scenes in the plan.
    pub fn total_scenes(&self) -> u32 {
        self.scenes.len() as u32
    }

    /// Whether narration is disabled for the whole run.
    pub fn narration_disabled(&self) -> bool {
        self.voice.trim().eq_ignore_ascii_case(VOICE_NONE)
    }

    /// Look up a scene by its number.
    pub fn scene(&self, scene_number: u32) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.scene_number == scene_number)
    }

    /// Check the plan invariants: at least one scene, positive unique numbers.
    pub fn validate(&self) -> ModelResult<()> {
        if self.scenes.is_empty() {
            return Err(ModelError::EmptyPlan);
        }

        let mut seen = HashSet::with_capacity(self.scenes.len());
        for scene in &self.scenes {
            if scene.scene_number == 0 {
                return Err(ModelError::InvalidSceneNumber(0));
            }
            if !seen.insert(scene.scene_number) {
                return Err(ModelError::DuplicateScene(scene.scene_number));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(numbers: &[u32]) -> VideoPlan {
        VideoPlan::new(
            VideoId::from("v1"),
            numbers
                .iter()
                .map(|n| Scene::new(*n, format!("image {}", n), "text"))
                .collect(),
        )
    }

    #[test]
    fn test_validate_accepts_non_contiguous_numbers() {
        assert!(plan(&[1, 3, 7]).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_plans() {
        assert_eq!(plan(&[]).validate(), Err(ModelError::EmptyPlan));
        assert_eq!(plan(&[1, 2, 2]).validate(), Err(ModelError::DuplicateScene(2)));
        assert_eq!(plan(&[0, 1]).validate(), Err(ModelError::InvalidSceneNumber(0)));
    }

    #[test]
    fn test_narration_disabled() {
        assert!(plan(&[1]).with_voice("none").narration_disabled());
        assert!(plan(&[1]).with_voice(" NONE ").narration_disabled());
        assert!(!plan(&[1]).narration_disabled());
    }

    #[test]
    fn test_scene_has_narration() {
        assert!(!Scene::new(1, "img", "   ").has_narration());
        assert!(Scene::new(1, "img", "hello").has_narration());
    }

    #[test]
    fn test_plan_deserialize_defaults() {
        let json = r#"{
            "video_id": "abc",
            "scenes": [{"scene_number": 2, "image_prompt": "a city"}]
        }"#;
        let plan: VideoPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.aspect_ratio, AspectRatio::LANDSCAPE);
        assert_eq!(plan.voice, "neutral");
        assert_eq!(plan.scenes[0].narration, "");
    }
}
