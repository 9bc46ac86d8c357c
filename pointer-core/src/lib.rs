//! pointer-core: shared data model for the pointing pipeline
//!
//! Frames, geometry, detections and hand landmarks exchanged between the
//! vision (`pointer-eye`) and speech (`pointer-spk`) crates, plus the core
//! error type and the cooperative shutdown signal both pipeline roles observe.

pub mod error;
pub mod frame;
pub mod shutdown;
pub mod types;

pub use error::{Error, Result};
pub use frame::Frame;
pub use shutdown::ShutdownSignal;
pub use types::{
    BoundingBox, Detection, DetectionResult, HandLandmarks, Point, PointedObject,
    LANDMARK_COUNT,
};
