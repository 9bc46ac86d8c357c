//! Configuration for pointer-eye

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Vision pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Requested camera resolution (width, height)
    pub resolution: (u32, u32),
    /// Buffered frames discarded before a capture that follows an idle gap
    pub flush_frames: u32,
    /// Object detection model (ONNX)
    pub model_path: PathBuf,
    /// Palm detection model (ONNX), locates the hand for the landmark model
    pub palm_model_path: PathBuf,
    /// Hand landmark model (ONNX)
    pub hand_model_path: PathBuf,
    /// Square input size the detection model runs at
    pub inference_size: u32,
    /// Minimum detection confidence, also the NMS score threshold
    pub confidence_threshold: f32,
    /// IoU above which NMS suppresses the weaker box
    pub iou_threshold: f32,
    /// Labels never reported
    pub excluded_labels: BTreeSet<String>,
    /// Minimum box width and height in pixels
    pub min_box_size: i32,
    /// Pixels added around the hand box for hand-region exclusion
    pub hand_margin: i32,
    /// EMA weight of the previous fingertip estimate
    pub smoothing_alpha: f32,
    /// Minimum palm detection score
    pub palm_score_threshold: f32,
    /// Minimum hand presence score
    pub hand_presence_threshold: f32,
    /// Seconds a label must be held before it is (re-)announced
    pub announce_interval_secs: f64,
    /// Drop detections whose bottom edge is below the fingertip
    pub filter_above_fingertip: bool,
    /// Drop detections touching the hand region
    pub exclude_hand_region: bool,
    /// Detection role sleep when no new frame is available
    pub idle_backoff_ms: u64,
    /// How long shutdown waits for queued speech
    pub shutdown_grace_ms: u64,
    /// Follow each announcement with walking directions
    pub guidance: bool,
    /// Show the annotated feed in a window
    pub display: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            resolution: (640, 480),
            flush_frames: 4,
            model_path: PathBuf::from("./models/yolov8n.onnx"),
            palm_model_path: PathBuf::from("./models/palm_detection.onnx"),
            hand_model_path: PathBuf::from("./models/hand_landmark.onnx"),
            inference_size: 960,
            confidence_threshold: 0.4,
            iou_threshold: 0.4,
            excluded_labels: BTreeSet::new(),
            min_box_size: 15,
            hand_margin: 10,
            smoothing_alpha: 0.7,
            palm_score_threshold: 0.5,
            hand_presence_threshold: 0.7,
            announce_interval_secs: 1.0,
            filter_above_fingertip: false,
            exclude_hand_region: false,
            idle_backoff_ms: 10,
            shutdown_grace_ms: 2000,
            guidance: false,
            display: true,
        }
    }
}

impl VisionConfig {
    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs_f64(self.announce_interval_secs)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if self.camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }

        if self.flush_frames > 30 {
            return Err("flush_frames too large (max 30)".to_string());
        }

        if self.inference_size < 32 || self.inference_size > 4096 || self.inference_size % 32 != 0 {
            return Err("Inference size must be a multiple of 32 between 32 and 4096".to_string());
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err("IoU threshold must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.palm_score_threshold) {
            return Err("Palm score threshold must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.hand_presence_threshold) {
            return Err("Hand presence threshold must be between 0.0 and 1.0".to_string());
        }

        // alpha == 1.0 would freeze the fingertip at its first position
        if !(0.0..1.0).contains(&self.smoothing_alpha) {
            return Err("Smoothing alpha must be in [0.0, 1.0)".to_string());
        }

        if self.min_box_size < 0 {
            return Err("Minimum box size cannot be negative".to_string());
        }

        if self.hand_margin < 0 {
            return Err("Hand margin cannot be negative".to_string());
        }

        if !self.announce_interval_secs.is_finite() || self.announce_interval_secs < 0.0 {
            return Err("Announcement interval must be a non-negative number of seconds".to_string());
        }

        if self.idle_backoff_ms == 0 || self.idle_backoff_ms > 1000 {
            return Err("Idle backoff must be between 1 and 1000 ms".to_string());
        }

        if self.excluded_labels.iter().any(|label| label.trim().is_empty()) {
            return Err("Excluded labels cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = VisionConfig::default();
        assert_eq!(config.camera_id, 0);
        assert_eq!(config.resolution, (640, 480));
        assert_eq!(config.inference_size, 960);
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.iou_threshold, 0.4);
        assert_eq!(config.min_box_size, 15);
        assert_eq!(config.hand_margin, 10);
        assert_eq!(config.smoothing_alpha, 0.7);
        assert_eq!(config.announce_interval(), Duration::from_secs(1));
        assert!(!config.filter_above_fingertip);
        assert!(!config.exclude_hand_region);
        assert!(config.excluded_labels.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_resolution() {
        let mut config = VisionConfig::default();
        config.resolution = (0, 480);
        assert!(config.validate().is_err());
        config.resolution = (7681, 4320);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_thresholds() {
        let mut config = VisionConfig::default();
        config.confidence_threshold = 1.2;
        assert!(config.validate().is_err());

        let mut config = VisionConfig::default();
        config.iou_threshold = -0.1;
        assert!(config.validate().is_err());

        let mut config = VisionConfig::default();
        config.smoothing_alpha = 1.0;
        assert!(config.validate().is_err());
        config.smoothing_alpha = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_inference_size() {
        let mut config = VisionConfig::default();
        config.inference_size = 950;
        assert!(config.validate().is_err());
        config.inference_size = 640;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_label() {
        let mut config = VisionConfig::default();
        config.excluded_labels.insert(" ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_partial_json() {
        let config: VisionConfig =
            serde_json::from_str(r#"{"camera_id": 2, "excluded_labels": ["person"]}"#).unwrap();
        assert_eq!(config.camera_id, 2);
        assert!(config.excluded_labels.contains("person"));
        assert_eq!(config.flush_frames, 4);
    }
}
