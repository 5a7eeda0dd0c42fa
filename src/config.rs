use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use tracing::{debug, error};

/// Memory layout the networks expect their input tensors in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    Nchw,
    Nhwc,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub camera_index: u32,
    /// Minimum palm detection score.
    pub detection_confidence: f32,
    /// Minimum hand presence score reported by the landmark network.
    pub tracking_confidence: f32,
    pub palm_model_path: PathBuf,
    pub palm_input_size: u32,
    pub model_path: PathBuf,
    pub model_repo: Option<String>,
    pub input_size: u32,
    pub input_layout: InputLayout,
    /// Apply a sigmoid to the landmark presence and handedness outputs (for models exporting
    /// logits). Palm scores are always logits.
    pub sigmoid_scores: bool,
    pub flip_type: bool,
    pub draw: bool,
    pub window_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            detection_confidence: 0.8,
            tracking_confidence: 0.5,
            palm_model_path: PathBuf::from("models/palm_detection_full.onnx"),
            palm_input_size: 192,
            model_path: PathBuf::from("models/hand_landmark_full.onnx"),
            model_repo: None,
            input_size: 224,
            input_layout: InputLayout::Nchw,
            sigmoid_scores: false,
            flip_type: true,
            draw: true,
            window_title: "Video".to_string(),
        }
    }
}

pub fn config_path() -> PathBuf {
    env::var_os("FINGER_COUNTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("finger-counter.json"))
}

pub fn load_config() -> Config {
    let path = config_path();
    if let Ok(data) = fs::read(&path) {
        match serde_json::from_slice::<Config>(&data) {
            Ok(cfg) => return cfg.sanitized(),
            Err(e) => error!(path = %path.display(), "ignoring malformed config: {e}"),
        }
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
    }
    Config::default()
}

pub fn save_config(cfg: &Config) {
    let path = config_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(data) = serde_json::to_vec_pretty(cfg) {
        if let Err(e) = fs::write(&path, data) {
            error!("failed to write config: {e}");
        }
    } else {
        error!("failed to encode config");
    }
}

impl Config {
    /// Clamps values a hand-edited file may have pushed out of range.
    pub fn sanitized(mut self) -> Self {
        let defaults = Config::default();
        if !self.detection_confidence.is_finite() {
            self.detection_confidence = defaults.detection_confidence;
        }
        if !self.tracking_confidence.is_finite() {
            self.tracking_confidence = defaults.tracking_confidence;
        }
        self.detection_confidence = self.detection_confidence.clamp(0.0, 1.0);
        self.tracking_confidence = self.tracking_confidence.clamp(0.0, 1.0);
        self.input_size = self.input_size.max(1);
        self.palm_input_size = self.palm_input_size.max(1);
        self
    }
}
