//! YOLOv8 object detection model

use crate::processing::detection::nms;
use crate::utils::rescale;
use pointer_core::{BoundingBox, Detection};
use std::collections::BTreeMap;

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Candidates scoring below this never leave the backend
pub const MIN_CANDIDATE_SCORE: f32 = 0.25;

/// Per-class overlap the backend itself merges before the detector's own NMS
pub const BACKEND_IOU: f32 = 0.7;

/// Decode a YOLOv8 `[1, 4 + C, N]` output into frame-space detections.
///
/// Each of the N columns holds `cx, cy, w, h` in model-input pixels followed
/// by C class scores. Boxes are rescaled to the frame, truncated and clamped.
/// Overlapping same-class candidates are merged so the result resembles what
/// a YOLO predictor returns.
pub fn decode_output(
    data: &[f32],
    shape: &[i64],
    input_size: u32,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Detection> {
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 || shape[2] <= 0 {
        return Vec::new();
    }
    let rows = shape[1] as usize;
    let anchors = shape[2] as usize;
    if data.len() < rows * anchors {
        return Vec::new();
    }
    let num_classes = (rows - 4).min(COCO_CLASSES.len());

    let at = |row: usize, anchor: usize| data[row * anchors + anchor];
    let mut by_class: BTreeMap<usize, Vec<Detection>> = BTreeMap::new();

    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class in 0..num_classes {
            let score = at(4 + class, anchor);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if !best_score.is_finite() || best_score < MIN_CANDIDATE_SCORE {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let max_x = frame_width as i32;
        let max_y = frame_height as i32;
        let bbox = BoundingBox::new(
            rescale(cx - w / 2.0, input_size, frame_width).clamp(0, max_x),
            rescale(cy - h / 2.0, input_size, frame_height).clamp(0, max_y),
            rescale(cx + w / 2.0, input_size, frame_width).clamp(0, max_x),
            rescale(cy + h / 2.0, input_size, frame_height).clamp(0, max_y),
        );
        if !bbox.is_valid() {
            continue;
        }

        by_class
            .entry(best_class)
            .or_default()
            .push(Detection::new(bbox, COCO_CLASSES[best_class], best_score.min(1.0)));
    }

    by_class
        .into_values()
        .flat_map(|candidates| nms(candidates, 0.0, BACKEND_IOU))
        .collect()
}

#[cfg(feature = "onnx")]
pub use onnx::YoloModel;

#[cfg(feature = "onnx")]
mod onnx {
    use super::decode_output;
    use crate::error::VisionError;
    use crate::models::DetectionModel;
    use crate::utils::rgb_to_chw_tensor;
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use pointer_core::{Detection, Frame};
    use std::path::Path;
    use tracing::{debug, info};

    /// YOLOv8 detector running on ONNX Runtime
    pub struct YoloModel {
        session: Session,
        input_size: u32,
    }

    impl YoloModel {
        pub fn new(model_path: &Path, input_size: u32) -> Result<Self, VisionError> {
            let load_error = |e: &dyn std::fmt::Display| {
                VisionError::Model(format!("Failed to load YOLO model {:?}: {}", model_path, e))
            };
            let session = Session::builder()
                .map_err(|e| load_error(&e))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| load_error(&e))?
                .commit_from_file(model_path)
                .map_err(|e| load_error(&e))?;

            info!("YOLO model loaded from {:?} ({}x{} input)", model_path, input_size, input_size);
            Ok(Self { session, input_size })
        }
    }

    impl DetectionModel for YoloModel {
        fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
            let size = self.input_size;
            let data = rgb_to_chw_tensor(&frame.image, size, size)?;
            let input = Tensor::from_array((vec![1i64, 3, size as i64, size as i64], data))?;

            let outputs = self.session.run(ort::inputs![input])?;
            let (shape, values) = outputs[0].try_extract_tensor::<f32>()?;

            let detections = decode_output(values, shape, size, frame.width(), frame.height());
            debug!("YOLO produced {} candidates", detections.len());
            Ok(detections)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[1, 84, n]` tensor from (cx, cy, w, h, class, score) rows
    fn tensor(candidates: &[(f32, f32, f32, f32, usize, f32)]) -> (Vec<f32>, Vec<i64>) {
        let anchors = candidates.len();
        let rows = 4 + COCO_CLASSES.len();
        let mut data = vec![0.0f32; rows * anchors];
        for (i, &(cx, cy, w, h, class, score)) in candidates.iter().enumerate() {
            data[i] = cx;
            data[anchors + i] = cy;
            data[2 * anchors + i] = w;
            data[3 * anchors + i] = h;
            data[(4 + class) * anchors + i] = score;
        }
        (data, vec![1, rows as i64, anchors as i64])
    }

    #[test]
    fn test_decode_rescales_to_frame() {
        // 960 input, 640x480 frame: x scale 2/3, y scale 1/2
        let (data, shape) = tensor(&[(480.0, 480.0, 96.0, 96.0, 41, 0.9)]);
        let detections = decode_output(&data, &shape, 960, 640, 480);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "cup");
        assert_eq!(detections[0].bbox, BoundingBox::new(288, 216, 352, 264));
    }

    #[test]
    fn test_decode_drops_weak_candidates() {
        let (data, shape) = tensor(&[(100.0, 100.0, 50.0, 50.0, 0, 0.1)]);
        assert!(decode_output(&data, &shape, 640, 640, 640).is_empty());
    }

    #[test]
    fn test_decode_merges_same_class_duplicates() {
        let (data, shape) = tensor(&[
            (100.0, 100.0, 50.0, 50.0, 73, 0.8),
            (101.0, 100.0, 50.0, 50.0, 73, 0.6),
            (101.0, 100.0, 50.0, 50.0, 41, 0.5),
        ]);
        let detections = decode_output(&data, &shape, 640, 640, 640);
        assert_eq!(detections.len(), 2);
        assert!(detections.iter().any(|d| d.label == "book" && (d.confidence - 0.8).abs() < 1e-6));
        assert!(detections.iter().any(|d| d.label == "cup"));
    }

    #[test]
    fn test_decode_clamps_to_frame() {
        let (data, shape) = tensor(&[(10.0, 10.0, 60.0, 60.0, 0, 0.9)]);
        let detections = decode_output(&data, &shape, 640, 640, 640);
        assert_eq!(detections[0].bbox, BoundingBox::new(0, 0, 40, 40));
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[0.0; 10], &[1, 2, 5], 640, 640, 640).is_empty());
        assert!(decode_output(&[0.0; 10], &[1, 84, 100], 640, 640, 640).is_empty());
    }
}
