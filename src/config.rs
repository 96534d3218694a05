// src/config.rs
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::gesture::GestureThresholds;

/// Where hand landmarks come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// No detector: every tick reports an empty view.
    Idle,
    /// A synthetic hand cycling through the gestures.
    Simulated,
    Scripted { path: PathBuf, #[serde(default)] looping: bool },
    Camera { #[serde(default)] index: u32 },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub particle_count: usize,
    pub tree_height: f32,
    pub tree_radius: f32,
    pub scatter_radius: f32,
    /// Extra radius photos sit at, outside the particle cone.
    pub photo_offset: f32,
    pub photo_base_size: f32,
    pub zoom_magnification: f32,
    pub zoom_point: [f32; 3],
    pub camera_distance: f32,
    /// Radians per second while the tree is assembled.
    pub tree_spin_speed: f32,
    pub debounce_ms: u64,
    pub layout_seed: u64,
    pub source: SourceConfig,
    pub source_fps: u32,
    pub thresholds: GestureThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            particle_count: 1500,
            tree_height: 14.0,
            tree_radius: 5.5,
            scatter_radius: 18.0,
            photo_offset: 1.2,
            photo_base_size: 1.6,
            zoom_magnification: 4.0,
            zoom_point: [0.0, 0.0, 14.0],
            camera_distance: 26.0,
            tree_spin_speed: 0.15,
            debounce_ms: 500,
            layout_seed: 20_241_224,
            source: SourceConfig::default(),
            source_fps: 30,
            thresholds: GestureThresholds::default(),
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Platform config location, e.g. `~/.config/treelights/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "treelights", "treelights")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Loads the platform config, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
                Self::default()
            }
        }
    }
}
