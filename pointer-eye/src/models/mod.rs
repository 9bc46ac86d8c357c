//! Model capabilities and their inference backends
//!
//! The pipeline only sees the two traits below. ONNX implementations live
//! behind the `onnx` feature; tests substitute mocks or fakes.

pub mod hand;
pub mod palm;
pub mod yolo;

use crate::error::VisionError;
use pointer_core::{Detection, Frame, HandLandmarks};

pub use hand::decode_landmarks;
pub use palm::{decode_palm, HandRoi};
pub use yolo::{decode_output, COCO_CLASSES};

#[cfg(feature = "onnx")]
pub use hand::HandLandmarkModel;
#[cfg(feature = "onnx")]
pub use palm::PalmDetector;
#[cfg(feature = "onnx")]
pub use yolo::YoloModel;

/// Finds the landmarks of at most one hand in a frame.
///
/// Implementations locate the hand themselves; callers pass the whole frame.
#[cfg_attr(test, mockall::automock)]
pub trait LandmarkModel: Send {
    fn detect_hand(&mut self, frame: &Frame) -> Result<Option<HandLandmarks>, VisionError>;
}

/// Produces raw (unfiltered) detections in frame pixel space
#[cfg_attr(test, mockall::automock)]
pub trait DetectionModel: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;
}

/// Load the ONNX landmark and detection models named in `config`
#[cfg(feature = "onnx")]
pub fn load_models(
    config: &crate::config::VisionConfig,
) -> Result<(Box<dyn LandmarkModel>, Box<dyn DetectionModel>), VisionError> {
    let palm = PalmDetector::new(&config.palm_model_path, config.palm_score_threshold)?;
    let hand = HandLandmarkModel::new(palm, &config.hand_model_path, config.hand_presence_threshold)?;
    let yolo = YoloModel::new(&config.model_path, config.inference_size)?;
    Ok((Box::new(hand), Box::new(yolo)))
}

#[cfg(not(feature = "onnx"))]
pub fn load_models(
    config: &crate::config::VisionConfig,
) -> Result<(Box<dyn LandmarkModel>, Box<dyn DetectionModel>), VisionError> {
    Err(VisionError::Model(format!(
        "cannot load {:?}: model inference was not compiled in (enable the `onnx` feature)",
        config.model_path
    )))
}
