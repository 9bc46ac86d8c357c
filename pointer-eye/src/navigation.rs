//! Spoken walking directions toward a pointed object

use pointer_core::{BoundingBox, Point};

/// Turns a fingertip/object offset into a short instruction
#[derive(Debug, Clone, Copy)]
pub struct Navigator {
    frame_width: u32,
    frame_height: u32,
}

impl Navigator {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
        }
    }

    pub fn direction(&self, fingertip: Point, bbox: &BoundingBox) -> &'static str {
        let offset = bbox.center().x - fingertip.x;
        if (offset.abs() as f64) < self.frame_width as f64 * 0.1 {
            "straight"
        } else if offset > 0 {
            "to the right"
        } else {
            "to the left"
        }
    }

    /// One step per tenth of the frame height, at least one
    pub fn steps(&self, fingertip: Point, bbox: &BoundingBox) -> u32 {
        let offset = (bbox.center().y - fingertip.y).abs() as f64;
        let step = self.frame_height as f64 * 0.1;
        if step <= 0.0 {
            return 1;
        }
        ((offset / step) as u32).max(1)
    }

    pub fn instruction(&self, fingertip: Point, bbox: &BoundingBox) -> String {
        let steps = self.steps(fingertip, bbox);
        format!(
            "Take {} step{} forward and slightly {}.",
            steps,
            if steps > 1 { "s" } else { "" },
            self.direction(fingertip, bbox)
        )
    }
}
