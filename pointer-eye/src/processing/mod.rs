//! Per-frame processing stages

pub mod detection;
pub mod pointing;
pub mod resolver;

pub use detection::{nms, DetectorSettings, ObjectDetector};
pub use pointing::{is_pointing, FingertipSmoother, HandPointingDetector, PointingGesture};
pub use resolver::resolve;
