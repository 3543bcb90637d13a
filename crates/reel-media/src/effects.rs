//! Ken Burns style pan/zoom effects for still images.
//!
//! Every effect is an expression over zoompan's output frame counter `on`,
//! clamped to a fixed bound, evaluated on a 4x upscaled copy of the image and
//! emitted at the target resolution.

use std::fmt;

use reel_models::Resolution;
use serde::{Deserialize, Serialize};

/// Upscale factor applied before zoompan to avoid sub-pixel jitter.
pub const UPSCALE_FACTOR: u32 = 4;

/// Zoom added per output frame.
pub const ZOOM_STEP: f64 = 0.0015;

/// Upper zoom bound for zoom effects.
pub const MAX_ZOOM: f64 = 1.5;

/// Fixed zoom used while panning so there is room to move.
pub const PAN_ZOOM: f64 = 1.2;

/// Fraction of the horizontal travel covered per output frame.
pub const PAN_STEP: f64 = 0.002;

const CENTER_X: &str = "iw/2-(iw/zoom/2)";
const CENTER_Y: &str = "ih/2-(ih/zoom/2)";

/// Camera motion applied to a scene's still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualEffect {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    ZoomPan,
}

impl VisualEffect {
    /// Rotation order.
    pub const ALL: [VisualEffect; 5] = [
        VisualEffect::ZoomIn,
        VisualEffect::ZoomOut,
        VisualEffect::PanLeft,
        VisualEffect::PanRight,
        VisualEffect::ZoomPan,
    ];

    /// Effect for the scene at `index` (0-based position in render order).
    pub fn for_scene(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualEffect::ZoomIn => "zoom_in",
            VisualEffect::ZoomOut => "zoom_out",
            VisualEffect::PanLeft => "pan_left",
            VisualEffect::PanRight => "pan_right",
            VisualEffect::ZoomPan => "zoom_pan",
        }
    }

    /// zoompan `z`, `x`, `y` expressions (commas escaped for a filter chain).
    fn expressions(&self) -> (String, String, String) {
        let zoom_in = format!("min(1+{}*on\\,{})", ZOOM_STEP, MAX_ZOOM);
        let travel = format!("min(on*{}\\,1)", PAN_STEP);

        match self {
            VisualEffect::ZoomIn => (zoom_in, CENTER_X.to_string(), CENTER_Y.to_string()),
            VisualEffect::ZoomOut => (
                format!("max({}-{}*on\\,1)", MAX_ZOOM, ZOOM_STEP),
                CENTER_X.to_string(),
                CENTER_Y.to_string(),
            ),
            VisualEffect::PanLeft => (
                PAN_ZOOM.to_string(),
                format!("(iw-iw/zoom)*(1-{})", travel),
                CENTER_Y.to_string(),
            ),
            VisualEffect::PanRight => (
                PAN_ZOOM.to_string(),
                format!("(iw-iw/zoom)*{}", travel),
                CENTER_Y.to_string(),
            ),
            VisualEffect::ZoomPan => (
                zoom_in,
                format!("(iw-iw/zoom)*{}", travel),
                CENTER_Y.to_string(),
            ),
        }
    }

    /// Full video filter chain for a looped still image input.
    pub fn filter(&self, resolution: Resolution, fps: u32) -> String {
        let up_w = resolution.width * UPSCALE_FACTOR;
        let up_h = resolution.height * UPSCALE_FACTOR;
        let (z, x, y) = self.expressions();

        format!(
            "scale={up_w}:{up_h}:force_original_aspect_ratio=increase,\
             crop={up_w}:{up_h},\
             zoompan=z={z}:x={x}:y={y}:d=1:s={w}x{h}:fps={fps},\
             setsar=1,format=yuv420p",
            w = resolution.width,
            h = resolution.height,
        )
    }
}

impl fmt::Display for VisualEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
