//! Engine Settings
//!
//! Configuration for the placement engine. Every field has a default that
//! matches the behavior hosts expect out of the box, so most callers only
//! touch the viewport:
//!
//! ```rust,ignore
//! use anchorage::settings::{EngineSettings, Viewport};
//!
//! let settings = EngineSettings {
//!     viewport: Viewport::new(1080, 2340),
//!     ..Default::default()
//! };
//! ```
//!
//! Settings can also be read from JSON; missing keys fall back to defaults.

use serde::{Deserialize, Serialize};

/// Longest bounding dimension every loaded asset is rescaled to.
pub const CANONICAL_SIZE: f32 = 0.3;

/// Lower bound of the per-axis scale a pinch may produce.
pub const MIN_GESTURE_SCALE: f32 = 0.05;

/// Upper bound of the per-axis scale a pinch may produce.
pub const MAX_GESTURE_SCALE: f32 = 5.0;

// ---------------------------------------------------------------------------
// EngineSettings
// ---------------------------------------------------------------------------

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Target length of the longest bounding-box dimension after normalization.
    pub canonical_size: f32,
    /// Inclusive per-axis clamp applied to pinch scaling.
    pub scale_range: ScaleRange,
    /// Fallback camera used until the platform supplies a viewer pose.
    pub camera: CameraSettings,
    /// Initial size of the rendering surface, in physical pixels.
    pub viewport: Viewport,
    /// Capabilities requested when the AR session is started.
    pub session: SessionInit,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            canonical_size: CANONICAL_SIZE,
            scale_range: ScaleRange::default(),
            camera: CameraSettings::default(),
            viewport: Viewport::default(),
            session: SessionInit::default(),
        }
    }
}

impl EngineSettings {
    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-axis scale clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
}

impl ScaleRange {
    #[inline]
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            min: MIN_GESTURE_SCALE,
            max: MAX_GESTURE_SCALE,
        }
    }
}

/// Perspective camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            near: 0.01,
            far: 20.0,
        }
    }
}

/// Size of the rendering surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width / height, or 1.0 for a degenerate surface.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

// ---------------------------------------------------------------------------
// SessionInit
// ---------------------------------------------------------------------------

/// Capabilities requested from the platform when an AR session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInit {
    /// The session must not start without these.
    pub required_features: Vec<String>,
    /// Used when the platform offers them.
    pub optional_features: Vec<String>,
    /// Host element that receives the overlay UI, when `dom-overlay` is granted.
    pub overlay_root: Option<String>,
}

impl Default for SessionInit {
    fn default() -> Self {
        Self {
            required_features: vec!["hit-test".to_string()],
            optional_features: vec!["dom-overlay".to_string()],
            overlay_root: Some("body".to_string()),
        }
    }
}

impl SessionInit {
    #[must_use]
    pub fn requires(&self, feature: &str) -> bool {
        self.required_features.iter().any(|f| f == feature)
    }
}
