//! pointer-eye: Vision side of the pointing pipeline
//!
//! Frame sources, hand and object model capabilities with their ONNX
//! backends, the per-frame processing stages (pointing classification,
//! filtered detection with NMS, fingertip resolution), overlay and display,
//! walking guidance, and the two-role `PointingPipeline` that ties them to
//! the speech side.

pub mod camera;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod navigation;
pub mod overlay;
pub mod pipeline;
pub mod processing;
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
mod utils;

pub use camera::{open_camera, FrameSource, ImageSequenceSource};
pub use config::VisionConfig;
pub use display::{open_display, FrameDisplay, HeadlessDisplay};
pub use error::VisionError;
pub use models::{load_models, DetectionModel, LandmarkModel};
pub use navigation::Navigator;
pub use overlay::Overlay;
pub use pipeline::{FrameProcessor, PointingPipeline, SessionOutcome, SharedState};
pub use processing::{nms, resolve, HandPointingDetector, ObjectDetector};
