//! Video identity and output geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;

/// Unique identifier for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Aspect ratio of the finished video, e.g. `16:9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Landscape (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Portrait (9:16) for Shorts/Reels
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Image generation size for this ratio.
    ///
    /// Only 16:9 and 9:16 get a dedicated size; everything else is square.
    pub fn generation_size(&self) -> GenerationSize {
        match *self {
            AspectRatio::LANDSCAPE => GenerationSize::Wide,
            AspectRatio::PORTRAIT => GenerationSize::Tall,
            _ => GenerationSize::Square,
        }
    }

    /// Output resolution of rendered clips for this ratio.
    pub fn output_resolution(&self) -> Resolution {
        match *self {
            AspectRatio::LANDSCAPE => Resolution::new(1920, 1080),
            AspectRatio::PORTRAIT => Resolution::new(1080, 1920),
            _ => Resolution::new(1080, 1080),
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::LANDSCAPE
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidAspectRatio(s.to_string()))?;

        let width: u32 = w
            .parse()
            .map_err(|_| ModelError::InvalidAspectRatio(s.to_string()))?;
        let height: u32 = h
            .parse()
            .map_err(|_| ModelError::InvalidAspectRatio(s.to_string()))?;

        if width == 0 || height == 0 {
            return Err(ModelError::InvalidAspectRatio(s.to_string()));
        }

        Ok(AspectRatio { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(value: AspectRatio) -> Self {
        value.to_string()
    }
}

/// Size class requested from the image generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSize {
    Wide,
    Tall,
    Square,
}

impl GenerationSize {
    /// Pixel dimensions as the provider expects them (`WxH`).
    pub fn as_dimensions(&self) -> &'static str {
        match self {
            GenerationSize::Wide => "1792x1024",
            GenerationSize::Tall => "1024x1792",
            GenerationSize::Square => "1024x1024",
        }
    }
}

impl fmt::Display for GenerationSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dimensions())
    }
}

/// Pixel resolution of a rendered clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
