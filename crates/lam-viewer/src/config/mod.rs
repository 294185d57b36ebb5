//! Viewer configuration module
//!
//! Camera defaults, readiness polling budgets, link palette, display styling
//! and loader limits. Every section falls back to its defaults when missing
//! from the file.

mod manager;

pub use manager::{ConfigError, ConfigManager};

use std::time::Duration;

use lam_core::{DisplayStyle, Palette, PerspectiveCamera, Projection};
use serde::{Deserialize, Serialize};

use crate::readiness::RetryPolicy;

/// Initial camera and interaction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Position before any framing has run
    pub initial_position: [f32; 3],
    /// Attach orbit controls to the camera
    pub orbit_controls: bool,
    pub damping_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            aspect: 1.0,
            near: 0.01,
            far: 1000.0,
            initial_position: [2.0, 2.0, 2.0],
            orbit_controls: true,
            damping_factor: 0.05,
        }
    }
}

impl CameraConfig {
    pub fn projection(&self) -> Projection {
        Projection::new(self.fov_degrees, self.aspect)
    }

    /// Camera in its pre-framing state.
    pub fn build_camera(&self) -> PerspectiveCamera {
        PerspectiveCamera {
            fov_degrees: self.fov_degrees,
            aspect: self.aspect,
            near: self.near,
            far: self.far,
            position: self.initial_position.into(),
            ..PerspectiveCamera::default()
        }
    }
}

/// Readiness polling budgets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Largest bounding-box dimension above which geometry counts as arrived
    pub epsilon: f32,
    /// Poll for at least one loaded mesh
    pub mesh_poll: RetryPolicy,
    /// Poll for non-degenerate bounds before framing
    pub framing_poll: RetryPolicy,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            mesh_poll: RetryPolicy::new(Duration::ZERO, Duration::from_millis(200), 9),
            framing_poll: RetryPolicy::new(
                Duration::from_millis(200),
                Duration::from_millis(300),
                8,
            ),
        }
    }
}

/// Model loading limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Upper bound on fetching and parsing the root description
    pub root_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root_timeout: Duration::from_secs(30),
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewerConfig {
    /// Configuration format version
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub display: DisplayStyle,
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl ViewerConfig {
    /// Current configuration version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            ..Default::default()
        }
    }
}
