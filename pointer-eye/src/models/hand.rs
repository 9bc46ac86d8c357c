//! Hand landmark model
//!
//! Runs on the square crop found by the palm detector, never on the whole
//! frame.

use super::palm::HandRoi;
use pointer_core::{HandLandmarks, LANDMARK_COUNT};

/// Square input size of the landmark network
pub const HAND_INPUT_SIZE: u32 = 224;

/// Turn raw `21 x 3` landmark output on the `roi` crop into frame-space landmarks.
///
/// `coords` holds x, y, z per landmark in model-input pixels (z is ignored).
/// Returns `None` when the presence score is below `threshold` or the output
/// is malformed.
pub fn decode_landmarks(
    coords: &[f32],
    presence: f32,
    threshold: f32,
    roi: &HandRoi,
) -> Option<HandLandmarks> {
    if !presence.is_finite() || presence < threshold {
        return None;
    }
    if coords.len() < LANDMARK_COUNT * 3 {
        return None;
    }

    let points = coords
        .chunks_exact(3)
        .take(LANDMARK_COUNT)
        .map(|xyz| roi.to_frame(xyz[0], xyz[1], HAND_INPUT_SIZE))
        .collect();
    HandLandmarks::new(points)
}

#[cfg(feature = "onnx")]
pub use onnx::HandLandmarkModel;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{decode_landmarks, HAND_INPUT_SIZE};
    use crate::error::VisionError;
    use crate::models::palm::PalmDetector;
    use crate::models::LandmarkModel;
    use crate::utils::rgb_to_hwc_tensor;
    use ort::session::Session;
    use ort::value::Tensor;
    use pointer_core::{Frame, HandLandmarks};
    use std::path::Path;
    use tracing::{debug, info};

    /// MediaPipe-style single-hand tracker on ONNX Runtime: palm detector
    /// followed by the landmark network.
    ///
    /// The landmark network expects a `[1, 224, 224, 3]` crop; output 0 is the
    /// 63 landmark coordinates and output 1 the hand presence score.
    pub struct HandLandmarkModel {
        palm: PalmDetector,
        session: Session,
        presence_threshold: f32,
    }

    impl HandLandmarkModel {
        pub fn new(palm: PalmDetector, model_path: &Path, presence_threshold: f32) -> Result<Self, VisionError> {
            let session = Session::builder()
                .map_err(|e| VisionError::Ort(e.to_string()))?
                .commit_from_file(model_path)
                .map_err(|e| {
                    VisionError::Model(format!("Failed to load hand model {:?}: {}", model_path, e))
                })?;

            info!("Hand landmark model loaded from {:?}", model_path);
            Ok(Self {
                palm,
                session,
                presence_threshold,
            })
        }
    }

    impl LandmarkModel for HandLandmarkModel {
        fn detect_hand(&mut self, frame: &Frame) -> Result<Option<HandLandmarks>, VisionError> {
            let Some(roi) = self.palm.locate(frame)? else {
                return Ok(None);
            };

            let size = HAND_INPUT_SIZE as i64;
            let crop = roi.crop(&frame.image);
            let data = rgb_to_hwc_tensor(&crop, HAND_INPUT_SIZE, HAND_INPUT_SIZE)?;
            let input = Tensor::from_array((vec![1i64, size, size, 3], data))?;

            let outputs = self.session.run(ort::inputs![input])?;
            if outputs.len() < 2 {
                return Err(VisionError::Model(format!(
                    "Hand model produced {} outputs, expected at least 2",
                    outputs.len()
                )));
            }
            let (_, coords) = outputs[0].try_extract_tensor::<f32>()?;
            let (_, presence) = outputs[1].try_extract_tensor::<f32>()?;
            let presence = presence.first().copied().unwrap_or(0.0);

            let hand = decode_landmarks(coords, presence, self.presence_threshold, &roi);
            debug!("Hand presence {:.2}, landmarks found: {}", presence, hand.is_some());
            Ok(hand)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(x: f32, y: f32) -> Vec<f32> {
        (0..LANDMARK_COUNT).flat_map(|_| [x, y, 0.0]).collect()
    }

    use pointer_core::Point;

    const ROI: HandRoi = HandRoi { x: 0, y: 0, size: 224 };

    #[test]
    fn test_decode_identity_roi() {
        let hand = decode_landmarks(&coords(112.0, 56.0), 0.9, 0.7, &ROI).unwrap();
        assert_eq!(hand.index_tip(), Point::new(112, 56));
    }

    #[test]
    fn test_decode_maps_crop_into_frame() {
        // 112x112 crop whose corner sits at (300, 140): half scale plus offset
        let roi = HandRoi { x: 300, y: 140, size: 112 };
        let hand = decode_landmarks(&coords(112.0, 56.0), 0.9, 0.7, &roi).unwrap();
        assert_eq!(hand.index_tip(), Point::new(356, 168));
        assert!(hand.points().iter().all(|p| *p == Point::new(356, 168)));
    }

    #[test]
    fn test_decode_crop_partly_outside_frame() {
        let roi = HandRoi { x: -50, y: -20, size: 448 };
        let hand = decode_landmarks(&coords(10.0, 5.0), 0.9, 0.7, &roi).unwrap();
        assert_eq!(hand.index_tip(), Point::new(-30, -10));
    }

    #[test]
    fn test_decode_below_presence_threshold() {
        assert!(decode_landmarks(&coords(112.0, 56.0), 0.5, 0.7, &ROI).is_none());
        assert!(decode_landmarks(&coords(112.0, 56.0), f32::NAN, 0.7, &ROI).is_none());
    }

    #[test]
    fn test_decode_short_output() {
        assert!(decode_landmarks(&[0.0; 30], 0.9, 0.7, &ROI).is_none());
    }
}
