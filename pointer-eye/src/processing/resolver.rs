//! Fingertip to object resolution

use pointer_core::{Detection, Point, PointedObject};

/// First detection, in the given order, whose box contains the fingertip
pub fn resolve(fingertip: Point, detections: &[Detection]) -> Option<PointedObject> {
    detections
        .iter()
        .find(|d| d.bbox.contains(fingertip))
        .map(|d| PointedObject {
            detection: d.clone(),
            fingertip,
        })
}
