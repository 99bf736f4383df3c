//! Configuration parsing and management for cartoon-head

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CartoonHeadError, ConfigError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub face: FaceConfig,
    pub tracking: TrackingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartoonHeadError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, CartoonHeadError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, CartoonHeadError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), CartoonHeadError> {
        let s = &self.surface;
        if !(s.fovy_deg > 0.0 && s.fovy_deg < 180.0) {
            return Err(invalid("surface.fovy_deg", "Field of view must be between 0 and 180 degrees"));
        }
        if !(s.near > 0.0 && s.near < s.far) {
            return Err(invalid("surface.near", "Near plane must be positive and less than far"));
        }
        if s.width == 0 || s.height == 0 {
            return Err(invalid("surface.width", "Surface size must be greater than 0"));
        }

        if let Some([_, _, w, h]) = self.face.viewport {
            if w <= 0 || h <= 0 {
                return Err(invalid("face.viewport", "Viewport width and height must be positive"));
            }
        }

        if self.tracking.frame_rate == 0 {
            return Err(invalid("tracking.frame_rate", "Frame rate must be greater than 0"));
        }
        if self.tracking.enabled && self.tracking.port == 0 {
            return Err(invalid("tracking.port", "Port must be greater than 0"));
        }

        if !self.face.model_path.is_empty() && !Path::new(&self.face.model_path).exists() {
            tracing::warn!("Face model not found at: {}", self.face.model_path);
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> CartoonHeadError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Projection and simulated-surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Vertical field of view in degrees
    pub fovy_deg: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Width of the simulated surface on desktop
    pub width: u32,
    /// Height of the simulated surface on desktop
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            fovy_deg: 60.0,
            near: 0.1,
            far: 100.0,
            width: 768,
            height: 768,
        }
    }
}

/// Head model and native draw configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Path to the GLB head model (desktop)
    pub model_path: String,
    /// Asset name inside the APK (android)
    pub asset_name: String,
    /// Clear color used by the native draw
    pub clear_color: [f32; 4],
    /// Fixed viewport `[x, y, width, height]`; follows the surface size when unset
    pub viewport: Option<[i32; 4]>,
    /// Extra model rotation, XYZ Euler angles in degrees
    pub rotation_deg: [f32; 3],
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            model_path: "assets/raccoon_head.glb".to_string(),
            asset_name: "raccoon_head.glb".to_string(),
            clear_color: [0.1, 0.2, 0.3, 0.5],
            viewport: None,
            rotation_deg: [0.0, 0.0, 0.0],
        }
    }
}

/// Landmarker result feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Receive landmarker results over UDP
    pub enabled: bool,
    /// Listen address for UDP socket
    pub listen_address: String,
    /// UDP port to receive results on
    pub port: u16,
    /// Simulated draw callback rate (frames per second)
    pub frame_rate: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: "127.0.0.1".to_string(),
            port: 12346,
            frame_rate: 30,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("cartoon-head");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/cartoon-head");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/cartoon-head");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("cartoon-head");
        }
    }

    PathBuf::from(".")
}
