//! Palm detection stage of the hand tracker
//!
//! The landmark network only works on a square crop centred on the hand. A
//! palm detector (MediaPipe `palm_detection` layout: 192x192 input, 2016 SSD
//! anchors, 18 regressors and one score logit per anchor) finds the palm in
//! the whole frame; the crop is the palm box grown to cover the fingers.

use image::{imageops, RgbImage};
use pointer_core::Point;

/// Square input size of the palm network
pub const PALM_INPUT_SIZE: u32 = 192;

/// Number of anchors the palm network predicts for
pub const PALM_ANCHOR_COUNT: usize = 2016;

/// Values per anchor: box (cx, cy, w, h) followed by 7 keypoints
pub const PALM_REGRESSORS: usize = 18;

/// Palm box growth so the crop covers the whole hand
const ROI_SCALE: f32 = 2.6;

/// Crop centre shift toward the fingers, in palm heights
const ROI_SHIFT_Y: f32 = -0.5;

/// (stride, anchors per cell) after merging layers of equal stride
const ANCHOR_LAYERS: [(u32, usize); 2] = [(8, 2), (16, 6)];

/// Anchor centres in normalized input coordinates, in network output order
pub fn palm_anchors() -> Vec<(f32, f32)> {
    let mut anchors = Vec::with_capacity(PALM_ANCHOR_COUNT);
    for (stride, per_cell) in ANCHOR_LAYERS {
        let cells = PALM_INPUT_SIZE / stride;
        for y in 0..cells {
            for x in 0..cells {
                let center = (
                    (x as f32 + 0.5) / cells as f32,
                    (y as f32 + 0.5) / cells as f32,
                );
                anchors.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }
    anchors
}

/// Best palm box, normalized to the square detector canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmDetection {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit.clamp(-100.0, 100.0)).exp())
}

/// Pick the highest-scoring palm at or above `threshold`.
///
/// `regressors` is `[N, 18]` in input pixels relative to each anchor, `logits`
/// is `[N]`. Malformed output yields `None`.
pub fn decode_palm(
    regressors: &[f32],
    logits: &[f32],
    anchors: &[(f32, f32)],
    threshold: f32,
) -> Option<PalmDetection> {
    let count = anchors.len();
    if logits.len() < count || regressors.len() < count * PALM_REGRESSORS {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (i, &logit) in logits.iter().take(count).enumerate() {
        if !logit.is_finite() {
            continue;
        }
        let score = sigmoid(logit);
        if score >= threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    let (index, score) = best?;
    let raw = &regressors[index * PALM_REGRESSORS..(index + 1) * PALM_REGRESSORS];
    let size = PALM_INPUT_SIZE as f32;
    let (ax, ay) = anchors[index];
    let palm = PalmDetection {
        cx: ax + raw[0] / size,
        cy: ay + raw[1] / size,
        width: raw[2] / size,
        height: raw[3] / size,
        score,
    };
    if !(palm.cx.is_finite() && palm.cy.is_finite()) || !(palm.width > 0.0 && palm.height > 0.0) {
        return None;
    }
    Some(palm)
}

/// Square hand crop in frame pixels; may extend past the frame edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandRoi {
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

impl HandRoi {
    /// Crop around a palm found on a `frame_width`x`frame_height` frame that
    /// was padded at the bottom or right into a square before detection.
    pub fn from_palm(palm: &PalmDetection, frame_width: u32, frame_height: u32) -> Option<Self> {
        let side = frame_width.max(frame_height) as f32;
        let cx = palm.cx * side;
        let cy = (palm.cy + ROI_SHIFT_Y * palm.height) * side;
        let size = palm.width.max(palm.height) * side * ROI_SCALE;

        // Larger than twice the frame is never a real hand
        if !(size >= 1.0 && size <= 2.0 * side) || !cx.is_finite() || !cy.is_finite() {
            return None;
        }
        Some(Self {
            x: (cx - size / 2.0) as i32,
            y: (cy - size / 2.0) as i32,
            size: size as u32,
        })
    }

    /// The crop as its own image; areas outside the frame are black
    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        let mut canvas = RgbImage::new(self.size, self.size);
        imageops::overlay(&mut canvas, image, -(self.x as i64), -(self.y as i64));
        canvas
    }

    /// Map a point in `input_size` model pixels of this crop back to the frame
    pub fn to_frame(&self, x: f32, y: f32, input_size: u32) -> Point {
        if input_size == 0 || !x.is_finite() || !y.is_finite() {
            return Point::new(self.x, self.y);
        }
        let scale = self.size as f32 / input_size as f32;
        Point::new(
            (self.x as f32 + x * scale) as i32,
            (self.y as f32 + y * scale) as i32,
        )
    }
}

/// Pad `image` at the right or bottom into a square, as the palm detector expects
pub fn pad_to_square(image: &RgbImage) -> RgbImage {
    let side = image.width().max(image.height());
    let mut canvas = RgbImage::new(side, side);
    imageops::overlay(&mut canvas, image, 0, 0);
    canvas
}

#[cfg(feature = "onnx")]
pub use onnx::PalmDetector;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{decode_palm, pad_to_square, palm_anchors, HandRoi, PALM_INPUT_SIZE};
    use crate::error::VisionError;
    use crate::utils::rgb_to_hwc_tensor;
    use ort::session::Session;
    use ort::value::Tensor;
    use pointer_core::Frame;
    use std::path::Path;
    use tracing::{debug, info};

    /// Palm detector on ONNX Runtime; output 0 regressors, output 1 score logits
    pub struct PalmDetector {
        session: Session,
        anchors: Vec<(f32, f32)>,
        score_threshold: f32,
    }

    impl PalmDetector {
        pub fn new(model_path: &Path, score_threshold: f32) -> Result<Self, VisionError> {
            let session = Session::builder()
                .map_err(|e| VisionError::Ort(e.to_string()))?
                .commit_from_file(model_path)
                .map_err(|e| {
                    VisionError::Model(format!("Failed to load palm model {:?}: {}", model_path, e))
                })?;

            info!("Palm detection model loaded from {:?}", model_path);
            Ok(Self {
                session,
                anchors: palm_anchors(),
                score_threshold,
            })
        }

        pub fn locate(&mut self, frame: &Frame) -> Result<Option<HandRoi>, VisionError> {
            let size = PALM_INPUT_SIZE as i64;
            let square = pad_to_square(&frame.image);
            let data = rgb_to_hwc_tensor(&square, PALM_INPUT_SIZE, PALM_INPUT_SIZE)?;
            let input = Tensor::from_array((vec![1i64, size, size, 3], data))?;

            let outputs = self.session.run(ort::inputs![input])?;
            if outputs.len() < 2 {
                return Err(VisionError::Model(format!(
                    "Palm model produced {} outputs, expected 2",
                    outputs.len()
                )));
            }
            let (_, regressors) = outputs[0].try_extract_tensor::<f32>()?;
            let (_, logits) = outputs[1].try_extract_tensor::<f32>()?;

            let roi = decode_palm(regressors, logits, &self.anchors, self.score_threshold)
                .and_then(|palm| HandRoi::from_palm(&palm, frame.width(), frame.height()));
            debug!("Palm ROI: {:?}", roi);
            Ok(roi)
        }
    }
}
