//! Geometry, detections and hand landmarks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of landmarks in a tracked hand
pub const LANDMARK_COUNT: usize = 21;

/// 2-D point in frame pixel space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned box in pixel space, corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> i64 {
        (self.width().max(0) as i64) * (self.height().max(0) as i64)
    }

    /// `x1 <= x2` and `y1 <= y2` with a non-empty area
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Point) -> bool {
        self.x1 <= point.x && point.x <= self.x2 && self.y1 <= point.y && point.y <= self.y2
    }

    /// Grow the box by `margin` pixels on every side
    pub fn expand(&self, margin: i32) -> Self {
        Self {
            x1: self.x1 - margin,
            y1: self.y1 - margin,
            x2: self.x2 + margin,
            y2: self.y2 + margin,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Intersection over union, 0.0 for disjoint or degenerate boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter_x1 = self.x1.max(other.x1);
        let inter_y1 = self.y1.max(other.y1);
        let inter_x2 = self.x2.min(other.x2);
        let inter_y2 = self.y2.min(other.y2);

        if inter_x2 <= inter_x1 || inter_y2 <= inter_y1 {
            return 0.0;
        }

        let inter_area = (inter_x2 - inter_x1) as i64 * (inter_y2 - inter_y1) as i64;
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0 {
            return 0.0;
        }

        let iou = inter_area as f64 / union_area as f64;
        iou.clamp(0.0, 1.0) as f32
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Labeled, confidence-scored box produced for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }
}

/// The 21 landmarks of one hand, in MediaPipe order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandLandmarks {
    points: Vec<Point>,
}

impl HandLandmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    /// Returns `None` unless exactly [`LANDMARK_COUNT`] points are given.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.len() != LANDMARK_COUNT {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Point {
        self.points[index]
    }

    pub fn index_tip(&self) -> Point {
        self.points[Self::INDEX_TIP]
    }

    /// Tight box around every landmark
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for p in &self.points {
            bbox.x1 = bbox.x1.min(p.x);
            bbox.y1 = bbox.y1.min(p.y);
            bbox.x2 = bbox.x2.max(p.x);
            bbox.y2 = bbox.y2.max(p.y);
        }
        bbox
    }
}

/// A detection together with the fingertip that selected it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointedObject {
    pub detection: Detection,
    pub fingertip: Point,
}

impl PointedObject {
    pub fn label(&self) -> &str {
        &self.detection.label
    }

    pub fn bbox(&self) -> BoundingBox {
        self.detection.bbox
    }
}

/// Latest output of the detection role
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub pointed: Option<PointedObject>,
    pub fingertip: Option<Point>,
    /// Sequence number of the frame this result was computed from
    pub frame_sequence: u64,
}

impl DetectionResult {
    pub fn empty(frame_sequence: u64) -> Self {
        Self {
            pointed: None,
            fingertip: None,
            frame_sequence,
        }
    }
}
