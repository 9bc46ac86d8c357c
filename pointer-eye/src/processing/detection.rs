//! Object detection with filtering and non-maximum suppression

use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::models::DetectionModel;
use pointer_core::{BoundingBox, Detection, Frame, Point};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Filter and NMS parameters
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub excluded_labels: BTreeSet<String>,
    pub min_box_size: i32,
    pub hand_margin: i32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::from(&VisionConfig::default())
    }
}

impl From<&VisionConfig> for DetectorSettings {
    fn from(config: &VisionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            excluded_labels: config.excluded_labels.clone(),
            min_box_size: config.min_box_size,
            hand_margin: config.hand_margin,
        }
    }
}

/// Either corner of `bbox` inside the hand box grown by `margin`
pub fn touches_hand(bbox: &BoundingBox, hand_box: &BoundingBox, margin: i32) -> bool {
    let region = hand_box.expand(margin);
    region.contains(bbox.top_left()) || region.contains(bbox.bottom_right())
}

/// Greedy non-maximum suppression.
///
/// Keeps boxes scoring strictly above `score_threshold`, visits them by
/// descending confidence (ties keep input order) and drops any box whose IoU
/// with an already kept box is strictly above `iou_threshold`.
pub fn nms(detections: Vec<Detection>, score_threshold: f32, iou_threshold: f32) -> Vec<Detection> {
    let mut candidates: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.confidence.is_finite() && d.confidence > score_threshold)
        .collect();
    candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.bbox.iou(&candidate.bbox) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

/// Runs the detection model and reduces its output to distinct objects
pub struct ObjectDetector {
    model: Box<dyn DetectionModel>,
    settings: DetectorSettings,
}

impl ObjectDetector {
    pub fn new(model: Box<dyn DetectionModel>, settings: DetectorSettings) -> Self {
        Self { model, settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Detect objects in `frame`.
    ///
    /// With a `hand_box`, boxes touching the hand are dropped; with a
    /// `fingertip`, boxes extending below it are dropped.
    pub fn detect(
        &mut self,
        frame: &Frame,
        fingertip: Option<Point>,
        hand_box: Option<BoundingBox>,
    ) -> Result<Vec<Detection>, VisionError> {
        let raw = self.model.infer(frame)?;
        let raw_count = raw.len();
        let detections = self.filter(raw, fingertip, hand_box);
        debug!("{} raw detections, {} after filtering", raw_count, detections.len());
        Ok(detections)
    }

    /// Apply the confidence, label, hand, fingertip and size filters, then NMS
    pub fn filter(
        &self,
        raw: Vec<Detection>,
        fingertip: Option<Point>,
        hand_box: Option<BoundingBox>,
    ) -> Vec<Detection> {
        let s = &self.settings;
        let survivors: Vec<Detection> = raw
            .into_iter()
            .filter(|d| d.confidence >= s.confidence_threshold)
            .filter(|d| !s.excluded_labels.contains(&d.label))
            .filter(|d| match hand_box {
                Some(ref hand) => !touches_hand(&d.bbox, hand, s.hand_margin),
                None => true,
            })
            .filter(|d| match fingertip {
                Some(tip) => d.bbox.y2 <= tip.y,
                None => true,
            })
            .filter(|d| d.bbox.width() >= s.min_box_size && d.bbox.height() >= s.min_box_size)
            .collect();

        nms(survivors, s.confidence_threshold, s.iou_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MockDetectionModel;

    fn det(x1: i32, y1: i32, x2: i32, y2: i32, label: &str, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2), label, confidence)
    }

    fn detector(settings: DetectorSettings) -> ObjectDetector {
        ObjectDetector::new(Box::new(MockDetectionModel::new()), settings)
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let kept = nms(
            vec![
                det(0, 0, 100, 100, "cup", 0.8),
                det(5, 5, 105, 105, "cup", 0.9),
                det(300, 300, 350, 350, "book", 0.5),
            ],
            0.4,
            0.4,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].label, "book");
    }

    #[test]
    fn test_nms_score_threshold_is_strict() {
        let kept = nms(vec![det(0, 0, 50, 50, "cup", 0.4)], 0.4, 0.4);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_nms_iou_threshold_is_strict() {
        // IoU exactly 1/3 with threshold 1/3 keeps both
        let a = det(0, 0, 50, 50, "a", 0.9);
        let b = det(25, 0, 75, 50, "b", 0.8);
        let iou = a.bbox.iou(&b.bbox);
        assert_eq!(nms(vec![a.clone(), b.clone()], 0.0, iou).len(), 2);
        assert_eq!(nms(vec![a, b], 0.0, iou - 0.01).len(), 1);
    }

    #[test]
    fn test_nms_ties_keep_input_order() {
        let kept = nms(
            vec![det(0, 0, 20, 20, "first", 0.7), det(100, 100, 120, 120, "second", 0.7)],
            0.4,
            0.4,
        );
        assert_eq!(kept[0].label, "first");
        assert_eq!(kept[1].label, "second");
    }

    #[test]
    fn test_filter_confidence_and_labels() {
        let mut settings = DetectorSettings::default();
        settings.excluded_labels.insert("person".to_string());
        let detector = detector(settings);

        let out = detector.filter(
            vec![
                det(0, 0, 50, 50, "cup", 0.39),
                det(100, 0, 150, 50, "person", 0.95),
                det(200, 0, 250, 50, "book", 0.41),
            ],
            None,
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "book");
    }

    #[test]
    fn test_filter_small_boxes() {
        let detector = detector(DetectorSettings::default());
        let out = detector.filter(
            vec![
                det(0, 0, 14, 100, "pen", 0.9),
                det(100, 0, 200, 14, "ruler", 0.9),
                det(300, 0, 315, 15, "eraser", 0.9),
            ],
            None,
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "eraser");
    }

    #[test]
    fn test_filter_below_fingertip() {
        let detector = detector(DetectorSettings::default());
        let tip = Some(Point::new(100, 100));
        let out = detector.filter(
            vec![det(80, 20, 150, 100, "clock", 0.9), det(80, 80, 150, 150, "cup", 0.9)],
            tip,
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "clock");
    }

    #[test]
    fn test_filter_hand_region() {
        let detector = detector(DetectorSettings::default());
        let hand = Some(BoundingBox::new(100, 100, 200, 200));
        let out = detector.filter(
            vec![
                // top-left just inside the 10 px margin
                det(205, 205, 300, 300, "phone", 0.9),
                // bottom-right on the margin edge
                det(20, 20, 90, 90, "remote", 0.9),
                // clear of the hand
                det(300, 300, 400, 400, "book", 0.9),
            ],
            None,
            hand,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "book");
    }

    #[test]
    fn test_box_spanning_hand_is_kept() {
        // Both corners outside the region even though the box covers it
        assert!(!touches_hand(
            &BoundingBox::new(0, 0, 500, 500),
            &BoundingBox::new(100, 100, 200, 200),
            10
        ));
    }

    #[test]
    fn test_detect_runs_model() {
        let mut model = MockDetectionModel::new();
        model.expect_infer().times(1).returning(|_| {
            Ok(vec![
                Detection::new(BoundingBox::new(80, 80, 150, 150), "cup", 0.9),
                Detection::new(BoundingBox::new(82, 82, 150, 150), "cup", 0.6),
            ])
        });
        let mut detector = ObjectDetector::new(Box::new(model), DetectorSettings::default());
        let out = detector.detect(&Frame::blank(640, 480, 1), None, None).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn test_detect_propagates_model_error() {
        let mut model = MockDetectionModel::new();
        model
            .expect_infer()
            .returning(|_| Err(VisionError::Model("session poisoned".to_string())));
        let mut detector = ObjectDetector::new(Box::new(model), DetectorSettings::default());
        assert!(detector.detect(&Frame::blank(64, 64, 1), None, None).is_err());
    }
}
