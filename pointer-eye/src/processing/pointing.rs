//! Pointing gesture classification and fingertip smoothing

use crate::error::VisionError;
use crate::models::LandmarkModel;
use pointer_core::{BoundingBox, Frame, HandLandmarks, Point};
use tracing::debug;

/// Index finger extended, the other three folded.
///
/// Only vertical relationships are used (y grows downward) and the thumb is
/// ignored.
pub fn is_pointing(hand: &HandLandmarks) -> bool {
    let index_tip = hand.get(HandLandmarks::INDEX_TIP);
    let index_dip = hand.get(HandLandmarks::INDEX_DIP);
    if index_tip.y > index_dip.y {
        return false;
    }

    let folded = |tip: usize, pip: usize| hand.get(tip).y >= hand.get(pip).y;
    folded(HandLandmarks::MIDDLE_TIP, HandLandmarks::MIDDLE_PIP)
        && folded(HandLandmarks::RING_TIP, HandLandmarks::RING_PIP)
        && folded(HandLandmarks::PINKY_TIP, HandLandmarks::PINKY_PIP)
}

/// Exponential moving average over fingertip positions
#[derive(Debug, Clone)]
pub struct FingertipSmoother {
    alpha: f32,
    state: Option<(f32, f32)>,
}

impl FingertipSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, state: None }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Blend `raw` into the estimate and return it, truncated to pixels
    pub fn update(&mut self, raw: Point) -> Point {
        let (rx, ry) = (raw.x as f32, raw.y as f32);
        let next = match self.state {
            None => (rx, ry),
            Some((sx, sy)) => (
                self.alpha * sx + (1.0 - self.alpha) * rx,
                self.alpha * sy + (1.0 - self.alpha) * ry,
            ),
        };
        self.state = Some(next);
        Point::new(next.0 as i32, next.1 as i32)
    }

    /// Unrounded filter state
    pub fn state(&self) -> Option<(f32, f32)> {
        self.state
    }

    pub fn current(&self) -> Option<Point> {
        self.state.map(|(x, y)| Point::new(x as i32, y as i32))
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// A pointing hand in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PointingGesture {
    /// Smoothed index fingertip
    pub fingertip: Point,
    /// Tight box around the hand's landmarks
    pub hand_box: BoundingBox,
}

/// Runs the landmark model and keeps the fingertip estimate across frames
pub struct HandPointingDetector {
    model: Box<dyn LandmarkModel>,
    smoother: FingertipSmoother,
}

impl HandPointingDetector {
    pub fn new(model: Box<dyn LandmarkModel>, alpha: f32) -> Self {
        Self {
            model,
            smoother: FingertipSmoother::new(alpha),
        }
    }

    /// `None` when no hand is found or it is not pointing; the smoothing
    /// state is only touched when a pointing hand is seen.
    pub fn detect(&mut self, frame: &Frame) -> Result<Option<PointingGesture>, VisionError> {
        let Some(hand) = self.model.detect_hand(frame)? else {
            return Ok(None);
        };
        if !is_pointing(&hand) {
            debug!("Hand found but not pointing");
            return Ok(None);
        }

        let fingertip = self.smoother.update(hand.index_tip());
        Ok(Some(PointingGesture {
            fingertip,
            hand_box: hand.bounding_box(),
        }))
    }

    pub fn smoother(&self) -> &FingertipSmoother {
        &self.smoother
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
    }
}
