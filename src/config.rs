//! JSON configuration for the camera and the viewer.
//!
//! Every field has a default, so a config file only needs the values it changes.

use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera;
use crate::scene::ImportOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Initial camera state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub world_up: [f32; 3],
    /// Degrees. -90 looks down negative z.
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            world_up: [0.0, 1.0, 0.0],
            yaw: camera::YAW,
            pitch: camera::PITCH,
            movement_speed: camera::SPEED,
            mouse_sensitivity: camera::SENSITIVITY,
            zoom: camera::ZOOM,
            near: camera::NEAR,
            far: camera::FAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "modelview3d".to_owned(),
            width: 1280,
            height: 720,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    pub geometry: Option<PathBuf>,
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from("shaders/model.vert"),
            fragment: PathBuf::from("shaders/model.frag"),
            geometry: None,
        }
    }
}

/// Settings of the `modelview3d` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowSettings,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    pub shaders: ShaderPaths,
    pub model: PathBuf,
    pub import: ImportOptions,
    pub camera: CameraSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            log_level: "info".to_owned(),
            shaders: ShaderPaths::default(),
            model: PathBuf::from("assets/cube.obj"),
            import: ImportOptions::default(),
            camera: CameraSettings {
                position: [0.0, 0.0, 3.0],
                ..Default::default()
            },
        }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The configured log level, or `info` when it is not recognised.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}
