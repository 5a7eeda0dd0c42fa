//! Hand detection.
//!
//! [`HandDetector`] is the seam the frame loop talks to. [`OnnxHandDetector`] chains two
//! MediaPipe-style networks through `candle-onnx`: a palm detector on a letterboxed copy of the
//! frame, then the hand landmark network on a rotated crop around each detected palm.

use candle_core::{DType, Device, Tensor};
use candle_onnx::{onnx, read_file, simple_eval};
use hf_hub::api::sync::Api;
use image::RgbImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::config::{Config, InputLayout};
use crate::error::{Error, Result};
use crate::hand::{Hand, Handedness, Landmark, LANDMARK_COUNT};

pub mod palm;
pub mod roi;

use palm::{decode_palms, non_max_suppression, order_outputs, palm_anchors, Anchor};
use roi::{Letterbox, RotatedRect};

/// At most one hand is ever reported per frame.
pub const MAX_HANDS: usize = 1;

pub trait HandDetector {
    /// Returns the hands found in `frame`, most confident first.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Hand>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSettings {
    pub max_hands: usize,
    /// Minimum palm score.
    pub confidence: f32,
    /// Minimum landmark presence score.
    pub tracking_confidence: f32,
    pub flip_type: bool,
}

impl DetectionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_hands: MAX_HANDS,
            confidence: cfg.detection_confidence,
            tracking_confidence: cfg.tracking_confidence,
            flip_type: cfg.flip_type,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Raw scores and coordinates from one landmark network invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLandmarks {
    pub screen: Vec<f32>,
    pub presence: f32,
    pub handedness: f32,
}

/// Turns raw landmark output for a `input_size` crop of `region` into a [`Hand`] in frame
/// coordinates, or `None` when the presence score is below the tracking threshold.
pub fn decode_hand(
    raw: &RawLandmarks,
    region: &RotatedRect,
    input_size: u32,
    settings: &DetectionSettings,
) -> Result<Option<Hand>> {
    if raw.screen.len() < LANDMARK_COUNT * 3 {
        return Err(Error::Inference(format!(
            "expected {} landmark values, got {}",
            LANDMARK_COUNT * 3,
            raw.screen.len()
        )));
    }
    if raw.presence < settings.tracking_confidence {
        trace!(presence = raw.presence, "hand below tracking threshold");
        return Ok(None);
    }

    let scale = region.side / input_size as f32;
    let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
    for (out, coords) in landmarks.iter_mut().zip(raw.screen.chunks_exact(3)) {
        let (x, y) = region.transform_out(coords[0] * scale, coords[1] * scale);
        *out = Landmark::new(x, y, coords[2] * scale);
    }

    let mut handedness = if raw.handedness > 0.5 {
        Handedness::Right
    } else {
        Handedness::Left
    };
    if settings.flip_type {
        handedness = handedness.flipped();
    }

    Ok(Some(Hand::new(landmarks, handedness, raw.presence)))
}

/// Resolves the model file, downloading it from `repo` when it is not present locally.
pub fn resolve_model(path: &Path, repo: Option<&str>) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    let Some(repo) = repo else {
        return Err(Error::ModelNotFound {
            path: path.to_path_buf(),
        });
    };
    let filename = path.to_string_lossy();
    debug!(%repo, file = %filename, "downloading model");
    Api::new()
        .and_then(|api| api.model(repo.to_string()).get(&filename))
        .map_err(|e| Error::Model(format!("failed to download model: {e}")))
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// One ONNX graph taking a square RGB image.
struct Network {
    model: onnx::ModelProto,
    input_name: String,
    output_names: Vec<String>,
    input_size: u32,
    layout: InputLayout,
}

impl Network {
    fn load(path: &Path, input_size: u32, layout: InputLayout, min_outputs: usize) -> Result<Self> {
        let model = read_file(path).map_err(|e| Error::Model(e.to_string()))?;
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| Error::Model("model graph missing".to_string()))?;
        let input_name = graph
            .input
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| Error::Model("model has no inputs".to_string()))?;
        let output_names: Vec<String> = graph.output.iter().map(|o| o.name.clone()).collect();
        if output_names.len() < min_outputs {
            return Err(Error::Model(format!(
                "expected at least {min_outputs} outputs in {}, found {}",
                path.display(),
                output_names.len()
            )));
        }
        debug!(
            path = %path.display(),
            input = %input_name,
            outputs = ?output_names,
            "model loaded"
        );

        Ok(Self {
            model,
            input_name,
            output_names,
            input_size,
            layout,
        })
    }

    fn input_tensor(&self, input: RgbImage, device: &Device) -> Result<Tensor> {
        let size = self.input_size as usize;
        let t = Tensor::from_vec(input.into_raw(), (size, size, 3), device)?;
        let t = match self.layout {
            InputLayout::Nchw => t.permute((2, 0, 1))?,
            InputLayout::Nhwc => t,
        };
        Ok(t.to_dtype(DType::F32)?.affine(1.0 / 255.0, 0.0)?.unsqueeze(0)?)
    }

    /// Runs the graph on an `input_size`² image and returns every output, flattened, in graph
    /// order.
    fn run(&self, input: RgbImage, device: &Device) -> Result<Vec<Vec<f32>>> {
        let mut inputs = HashMap::new();
        inputs.insert(self.input_name.clone(), self.input_tensor(input, device)?);
        let mut outputs = simple_eval(&self.model, inputs)?;

        self.output_names
            .iter()
            .map(|name| -> Result<Vec<f32>> {
                let tensor = outputs
                    .remove(name)
                    .ok_or_else(|| Error::Inference(format!("model output {name} missing")))?;
                Ok(tensor.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
            })
            .collect()
    }
}

pub struct OnnxHandDetector {
    palm: Network,
    landmark: Network,
    anchors: Vec<Anchor>,
    sigmoid_scores: bool,
    settings: DetectionSettings,
    device: Device,
}

impl OnnxHandDetector {
    pub fn load(cfg: &Config) -> Result<Self> {
        let repo = cfg.model_repo.as_deref();
        let palm_path = resolve_model(&cfg.palm_model_path, repo)?;
        let landmark_path = resolve_model(&cfg.model_path, repo)?;
        let palm = Network::load(&palm_path, cfg.palm_input_size, cfg.input_layout, 2)?;
        let landmark = Network::load(&landmark_path, cfg.input_size, cfg.input_layout, 3)?;

        Ok(Self {
            anchors: palm_anchors(cfg.palm_input_size),
            palm,
            landmark,
            sigmoid_scores: cfg.sigmoid_scores,
            settings: DetectionSettings::from_config(cfg),
            device: Device::Cpu,
        })
    }

    fn score(&self, values: &[f32]) -> Result<f32> {
        let v = values
            .first()
            .copied()
            .ok_or_else(|| Error::Inference("empty score output".to_string()))?;
        Ok(if self.sigmoid_scores { sigmoid(v) } else { v })
    }

    fn find_palms(&self, frame: &RgbImage) -> Result<Vec<RotatedRect>> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), self.palm.input_size);
        let mut outputs = self.palm.run(letterbox.apply(frame), &self.device)?.into_iter();
        let (boxes, scores) = match (outputs.next(), outputs.next()) {
            (Some(a), Some(b)) => order_outputs(a, b, self.anchors.len())?,
            _ => return Err(Error::Inference("palm model returned too few outputs".into())),
        };

        let palms = decode_palms(
            &boxes,
            &scores,
            &self.anchors,
            self.palm.input_size,
            self.settings.confidence,
        )?;
        let palms = non_max_suppression(palms, palm::NMS_IOU_THRESHOLD);
        trace!(palms = palms.len(), "palm network ran");

        Ok(palms
            .iter()
            .take(self.settings.max_hands)
            .map(|p| p.to_frame(&letterbox).hand_region())
            .collect())
    }

    fn track(&self, frame: &RgbImage, region: &RotatedRect) -> Result<Option<Hand>> {
        let size = self.landmark.input_size;
        let mut outputs = self.landmark.run(region.crop(frame, size), &self.device)?;
        let handedness = self.score(&outputs[2])?;
        let presence = self.score(&outputs[1])?;
        trace!(presence, handedness, "landmark network ran");

        let raw = RawLandmarks {
            screen: std::mem::take(&mut outputs[0]),
            presence,
            handedness,
        };
        decode_hand(&raw, region, size, &self.settings)
    }
}

impl HandDetector for OnnxHandDetector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Hand>> {
        let mut hands = Vec::new();
        for region in self.find_palms(frame)? {
            if let Some(hand) = self.track(frame, &region)? {
                hands.push(hand);
            }
        }
        Ok(hands)
    }
}
