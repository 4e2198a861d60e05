// Settings: a JSON file with defaults for everything, overridden by CLI flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::gesture::PINCH_THRESHOLD;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { index: 0, width: 1280, height: 720, fps: 30 }
    }
}

/// Options handed to the hand-landmark model. Fixed for this pad; kept in the
/// file so a different tracker script can be dropped in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub python: String,
    pub script: String,
    pub max_num_hands: u32,
    pub model_complexity: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            script: "hand_detect.py".into(),
            max_num_hands: 1,
            model_complexity: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub pinch_threshold: f32,
    pub ink_width: f32,
    pub erase_width: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self { pinch_threshold: PINCH_THRESHOLD, ink_width: 8.0, erase_width: 30.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".into(),
            model: "gemini-3-flash-preview".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            temperature: 0.8,
            top_p: 0.95,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub tracker: TrackerConfig,
    pub brush: BrushConfig,
    pub caption: CaptionConfig,
    pub export_dir: PathBuf,
}

impl AppConfig {
    /// Parse a config document; absent fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from `path`. A missing file means defaults; a broken one is
    /// logged and also falls back to defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match Self::from_json(&text) {
                Ok(cfg) => {
                    log::info!("Loaded settings from {:?}", path);
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse settings {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No settings file at {:?}, using defaults", path);
                Self::default()
            }
        }
    }
}
