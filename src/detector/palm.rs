//! Palm detection: SSD anchor decoding, non-maximum suppression and the hand region derived from
//! a palm.

use std::cmp::Ordering;

use crate::detector::roi::{rotate, Letterbox, RotatedRect};
use crate::detector::sigmoid;
use crate::error::{Error, Result};

/// Box center, size and 7 keypoints regressed per anchor.
const BOX_VALUES: usize = 18;
pub const KEYPOINT_COUNT: usize = 7;

/// Overlap above which a less confident palm is dropped.
pub const NMS_IOU_THRESHOLD: f32 = 0.3;

/// Enlargement from the palm box to a region holding the whole hand.
const ROI_SCALE: f32 = 2.6;
/// Shift of the region towards the fingers, relative to the palm box height.
const ROI_SHIFT_Y: f32 = -0.5;

/// Palm keypoints, in network output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist,
    IndexFingerMcp,
    MiddleFingerMcp,
    RingFingerMcp,
    PinkyMcp,
    ThumbCmc,
    ThumbMcp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x_center: f32,
    pub y_center: f32,
}

/// Anchors of the palm network for a square `input_size` input: 2 per cell on the stride-8 grid,
/// then 6 per cell on the stride-16 grid. Centers are relative (0..1).
pub fn palm_anchors(input_size: u32) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    for (stride, per_cell) in [(8u32, 2usize), (16, 6)] {
        let cells = input_size.div_ceil(stride).max(1);
        for y in 0..cells {
            for x in 0..cells {
                let anchor = Anchor {
                    x_center: (x as f32 + 0.5) / cells as f32,
                    y_center: (y as f32 + 0.5) / cells as f32,
                };
                anchors.extend(std::iter::repeat(anchor).take(per_cell));
            }
        }
    }
    anchors
}

#[derive(Debug, Clone, PartialEq)]
pub struct PalmDetection {
    pub score: f32,
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
    pub keypoints: [(f32, f32); KEYPOINT_COUNT],
}

impl PalmDetection {
    pub fn keypoint(&self, kp: PalmKeypoint) -> (f32, f32) {
        self.keypoints[kp as usize]
    }

    /// Maps a detection in network input pixels back to frame pixels.
    pub fn to_frame(&self, letterbox: &Letterbox) -> Self {
        let (x_center, y_center) = letterbox.to_frame(self.x_center, self.y_center);
        let mut keypoints = self.keypoints;
        for kp in &mut keypoints {
            *kp = letterbox.to_frame(kp.0, kp.1);
        }
        Self {
            score: self.score,
            x_center,
            y_center,
            width: self.width / letterbox.scale,
            height: self.height / letterbox.scale,
            keypoints,
        }
    }

    /// Clockwise angle from "fingers up" to the wrist → middle finger direction.
    pub fn rotation(&self) -> f32 {
        let (wx, wy) = self.keypoint(PalmKeypoint::Wrist);
        let (mx, my) = self.keypoint(PalmKeypoint::MiddleFingerMcp);
        (mx - wx).atan2(wy - my)
    }

    /// The rotated square the landmark network is run on.
    pub fn hand_region(&self) -> RotatedRect {
        let radians = self.rotation();
        let (dx, dy) = rotate(0.0, ROI_SHIFT_Y * self.height, radians);
        RotatedRect::new(
            self.x_center + dx,
            self.y_center + dy,
            self.width.max(self.height) * ROI_SCALE,
            radians,
        )
    }

    fn iou(&self, other: &Self) -> f32 {
        let (al, at) = (self.x_center - self.width / 2.0, self.y_center - self.height / 2.0);
        let (bl, bt) = (other.x_center - other.width / 2.0, other.y_center - other.height / 2.0);
        let w = ((al + self.width).min(bl + other.width) - al.max(bl)).max(0.0);
        let h = ((at + self.height).min(bt + other.height) - at.max(bt)).max(0.0);
        let inter = w * h;
        let union = self.width * self.height + other.width * other.height - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Sorts the two palm outputs into (boxes, scores) by their lengths.
pub fn order_outputs(
    a: Vec<f32>,
    b: Vec<f32>,
    anchor_count: usize,
) -> Result<(Vec<f32>, Vec<f32>)> {
    let boxes_len = anchor_count * BOX_VALUES;
    match (a.len(), b.len()) {
        (x, y) if x == boxes_len && y == anchor_count => Ok((a, b)),
        (x, y) if x == anchor_count && y == boxes_len => Ok((b, a)),
        (x, y) => Err(Error::Inference(format!(
            "palm outputs have {x} and {y} values, expected {boxes_len} and {anchor_count}"
        ))),
    }
}

/// Decodes raw palm regressors and score logits into detections scoring at least `min_score`,
/// in network input pixels.
pub fn decode_palms(
    boxes: &[f32],
    scores: &[f32],
    anchors: &[Anchor],
    input_size: u32,
    min_score: f32,
) -> Result<Vec<PalmDetection>> {
    if boxes.len() != anchors.len() * BOX_VALUES || scores.len() != anchors.len() {
        return Err(Error::Inference(format!(
            "palm outputs do not match {} anchors",
            anchors.len()
        )));
    }
    let size = input_size as f32;

    let mut palms = Vec::new();
    for ((anchor, raw), logit) in anchors.iter().zip(boxes.chunks_exact(BOX_VALUES)).zip(scores) {
        let score = sigmoid(logit.clamp(-100.0, 100.0));
        if score < min_score {
            continue;
        }
        let (ax, ay) = (anchor.x_center * size, anchor.y_center * size);
        let mut keypoints = [(0.0, 0.0); KEYPOINT_COUNT];
        for (kp, xy) in keypoints.iter_mut().zip(raw[4..].chunks_exact(2)) {
            *kp = (xy[0] + ax, xy[1] + ay);
        }
        palms.push(PalmDetection {
            score,
            x_center: raw[0] + ax,
            y_center: raw[1] + ay,
            width: raw[2],
            height: raw[3],
            keypoints,
        });
    }
    Ok(palms)
}

/// Keeps the most confident detection of every overlapping group, most confident first.
pub fn non_max_suppression(
    mut palms: Vec<PalmDetection>,
    iou_threshold: f32,
) -> Vec<PalmDetection> {
    palms.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut kept: Vec<PalmDetection> = Vec::new();
    for palm in palms {
        if kept.iter().all(|k| k.iou(&palm) < iou_threshold) {
            kept.push(palm);
        }
    }
    kept
}
