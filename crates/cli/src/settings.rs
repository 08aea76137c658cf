use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use maskwatch_core::shared::constants::{APP_DIR_NAME, DEFAULT_REFRESH_FPS, DEFAULT_THRESHOLD};

/// Persisted defaults for the CLI. Every field can be overridden per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub device: Option<String>,
    pub model: Option<PathBuf>,
    pub model_url: Option<String>,
    /// Confidence percentage a detection must exceed to be drawn.
    pub threshold: f32,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    pub video_left: Option<i32>,
    pub video_top: Option<i32>,
    pub y_offset: Option<i32>,
    /// Target refresh rate of the prediction loop.
    pub fps: f64,
    pub snapshot_every: usize,
    pub font: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            model: None,
            model_url: None,
            threshold: DEFAULT_THRESHOLD,
            display_width: None,
            display_height: None,
            viewport_width: None,
            viewport_height: None,
            video_left: None,
            video_top: None,
            y_offset: None,
            fps: DEFAULT_REFRESH_FPS,
            snapshot_every: 30,
            font: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads the user's settings, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    /// Loads settings from an explicit file. Unlike [`Settings::load`], a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn display(&self) -> Option<(u32, u32)> {
        self.display_width.zip(self.display_height)
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport_width.zip(self.viewport_height)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..100.0).contains(&self.threshold) {
            return Err(format!(
                "Threshold must be in [0, 100), got {}",
                self.threshold
            ));
        }
        check_pair("display", self.display_width, self.display_height)?;
        check_pair("viewport", self.viewport_width, self.viewport_height)?;
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(format!("Fps must be positive, got {}", self.fps));
        }
        if self.snapshot_every == 0 {
            return Err("Snapshot interval must be at least 1".into());
        }
        Ok(())
    }
}

fn check_pair(name: &str, width: Option<u32>, height: Option<u32>) -> Result<(), String> {
    match (width, height) {
        (None, None) => Ok(()),
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok(()),
        (Some(_), Some(_)) => Err(format!("{name} dimensions must be positive")),
        _ => Err(format!("{name} width and height must be given together")),
    }
}
