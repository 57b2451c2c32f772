//! Engine settings, read from TOML.
//!
//! Every field has a default so a config file only needs the keys it changes:
//!
//! ```toml
//! [window]
//! title = "level 1"
//!
//! [physics]
//! gravity = [0.0, 981.0]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::Deserialize;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub scene: SceneConfig,
    pub physics: PhysicsConfig,
    pub log: LogConfig,
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        toml::from_str(&text).map_err(|source| EngineError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "tilescene".to_owned(),
            width: 960,
            height: 640,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// RGB fill drawn behind everything else.
    pub background_color: [u8; 3],
    pub background_image: Option<PathBuf>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background_color: [20, 206, 215],
            background_image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Pixels per second squared; +y points down.
    pub gravity: [f32; 2],
    pub timestep: f32,
    /// Pixels per physics metre, used by the solver for its tolerances.
    pub length_unit: f32,
    pub max_substeps: u32,
}

impl PhysicsConfig {
    pub fn gravity(&self) -> Vec2 {
        Vec2::from(self.gravity)
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 981.0],
            timestep: 1.0 / 60.0,
            length_unit: 32.0,
            max_substeps: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.physics.gravity(), Vec2::new(0.0, 981.0));
        assert_eq!(config.scene.background_color, [20, 206, 215]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [window]
            title = "cave"

            [physics]
            gravity = [0.0, 500.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "cave");
        assert_eq!(config.window.width, 960);
        assert_eq!(config.physics.gravity, [0.0, 500.0]);
        assert_eq!(config.physics.max_substeps, 5);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_path("does/not/exist.toml").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
