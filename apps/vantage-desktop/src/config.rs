use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a primary click picks an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Cast a ray from the camera through the cursor.
    #[default]
    Ray,
    /// Read the identifier under the cursor from the picking target.
    Pixel,
}

/// Settings read from an optional JSON file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera_speed: f32,
    pub camera_sensitivity: f32,
    /// Frames per second; `0` disables pacing.
    pub target_fps: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub selection_mode: SelectionMode,
    pub scene_dir: PathBuf,
    /// Scene loaded at startup.
    pub scene: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera_speed: 1.0,
            camera_sensitivity: 0.2,
            target_fps: 60,
            window_width: 1280,
            window_height: 720,
            selection_mode: SelectionMode::Ray,
            scene_dir: PathBuf::from("./scenes"),
            scene: None,
        }
    }
}

impl AppConfig {
    /// Read `path` if it exists; otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Command-line values win over file values.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(dir) = &overrides.scene_dir {
            self.scene_dir = dir.clone();
        }
        if let Some(scene) = &overrides.scene {
            self.scene = Some(scene.clone());
        }
        if let Some(fps) = overrides.target_fps {
            self.target_fps = fps;
        }
        if let Some(mode) = overrides.selection_mode {
            self.selection_mode = mode;
        }
    }
}

/// Optional command-line replacements for config values.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub scene_dir: Option<PathBuf>,
    pub scene: Option<String>,
    pub target_fps: Option<u32>,
    pub selection_mode: Option<SelectionMode>,
}
