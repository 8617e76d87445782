//! Viewer configuration file
//!
//! JSON on disk; every field is optional and falls back to its default.

use anyhow::Context;
use ifc_scene_graph::SceneConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "IFC_SCENE_CONFIG";

/// Theme variants
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub theme: Theme,
    pub show_grid: bool,
    pub show_axes: bool,
    pub window_title: String,
    /// Scene construction settings
    pub scene: SceneConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            show_grid: true,
            show_axes: true,
            window_title: "IFC Scene Viewer".to_string(),
            scene: SceneConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading viewer config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing viewer config {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing viewer config {}", path.display()))
    }

    /// Load from `$IFC_SCENE_CONFIG`, or defaults when unset or unreadable
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let path = std::env::temp_dir().join(format!("ifc-scene-viewer-{}.json", std::process::id()));
        let mut config = ViewerConfig::default();
        config.theme = Theme::Light;
        config.show_grid = false;
        config.scene.worker_threads = Some(3);
        config.save(&path).unwrap();

        let loaded = ViewerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ViewerConfig = serde_json::from_str(r#"{ "theme": "light" }"#).unwrap();
        assert_eq!(config.theme, Theme::Light);
        assert!(config.show_axes);
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ViewerConfig::load("/nonexistent/ifc-scene.json").unwrap_err();
        assert!(format!("{:#}", err).contains("reading viewer config"));
    }
}
