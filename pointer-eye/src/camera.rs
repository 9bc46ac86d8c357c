//! Frame sources: USB webcam capture and image-sequence replay

use crate::config::VisionConfig;
use crate::error::VisionError;
use pointer_core::Frame;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Something that yields frames on demand.
///
/// `capture` returns `None` when the underlying read fails or yields an empty
/// image; the pipeline treats that as the end of the session.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<Frame>;

    /// Release the device. Safe to call more than once.
    fn release(&mut self);

    fn describe(&self) -> String;
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays image files from a directory in lexicographic order
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
    next_sequence: u64,
    released: bool,
}

impl ImageSequenceSource {
    /// Open `dir`; a missing directory or one without images is unavailable.
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self, VisionError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            VisionError::CameraUnavailable(format!("Cannot read frame directory {:?}: {}", dir, e))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && path.is_file() {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(VisionError::CameraUnavailable(format!(
                "No images found in {:?}",
                dir
            )));
        }
        files.sort();

        info!("Replaying {} frames from {:?}", files.len(), dir);
        Ok(Self {
            dir,
            files,
            position: 0,
            looping,
            next_sequence: 1,
            released: false,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn capture(&mut self) -> Option<Frame> {
        if self.released {
            return None;
        }
        if self.position >= self.files.len() {
            if !self.looping {
                debug!("Frame sequence exhausted");
                return None;
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;

        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!("Failed to read frame {:?}: {}", path, e);
                return None;
            }
        };
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let frame = Frame::new(image, self.next_sequence);
        self.next_sequence += 1;
        Some(frame)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!("Frame sequence {:?} released", self.dir);
        }
    }

    fn describe(&self) -> String {
        format!("image sequence {:?}", self.dir)
    }
}

/// Gap between reads after which the driver buffer is assumed to hold stale frames
pub const STALE_AFTER: Duration = Duration::from_millis(150);

/// How many buffered frames to discard before the next read.
///
/// A capture loop reading at camera rate keeps the buffer drained, so
/// flushing then only costs frame periods. Flush on the first read and after
/// the source sat idle for [`STALE_AFTER`].
pub fn frames_to_flush(last_read: Option<Instant>, now: Instant, flush_frames: u32) -> u32 {
    match last_read {
        Some(last) if now.saturating_duration_since(last) < STALE_AFTER => 0,
        _ => flush_frames,
    }
}

/// Open the configured camera device
#[cfg(feature = "camera")]
pub fn open_camera(config: &VisionConfig) -> Result<Box<dyn FrameSource>, VisionError> {
    Ok(Box::new(opencv_camera::CameraSource::open(config)?))
}

#[cfg(not(feature = "camera"))]
pub fn open_camera(config: &VisionConfig) -> Result<Box<dyn FrameSource>, VisionError> {
    Err(VisionError::CameraUnavailable(format!(
        "camera {} requested but camera support was not compiled in (enable the `camera` feature)",
        config.camera_id
    )))
}

#[cfg(feature = "camera")]
pub use opencv_camera::CameraSource;

#[cfg(feature = "camera")]
mod opencv_camera {
    use super::*;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };
    use tracing::error;

    /// USB webcam via OpenCV
    pub struct CameraSource {
        camera_id: u32,
        capture: Option<VideoCapture>,
        flush_frames: u32,
        last_read: Option<Instant>,
        next_sequence: u64,
    }

    impl CameraSource {
        pub fn open(config: &VisionConfig) -> Result<Self, VisionError> {
            let camera_id = config.camera_id;
            let mut capture = VideoCapture::new(camera_id as i32, CAP_ANY).map_err(|e| {
                VisionError::CameraUnavailable(format!("Failed to open camera {}: {}", camera_id, e))
            })?;

            let opened = capture.is_opened().map_err(|e| {
                VisionError::CameraUnavailable(format!("Camera {} not opened: {}", camera_id, e))
            })?;
            if !opened {
                return Err(VisionError::CameraUnavailable(format!(
                    "Camera {} failed to open",
                    camera_id
                )));
            }

            let (width, height) = config.resolution;
            capture
                .set(CAP_PROP_FRAME_WIDTH, width as f64)
                .map_err(|e| VisionError::Camera(format!("Failed to set width: {}", e)))?;
            capture
                .set(CAP_PROP_FRAME_HEIGHT, height as f64)
                .map_err(|e| VisionError::Camera(format!("Failed to set height: {}", e)))?;

            info!("Camera {} opened at {}x{}", camera_id, width, height);
            Ok(Self {
                camera_id,
                capture: Some(capture),
                flush_frames: config.flush_frames,
                last_read: None,
                next_sequence: 1,
            })
        }

        fn read_rgb(capture: &mut VideoCapture, flush_frames: u32) -> Result<Option<image::RgbImage>, VisionError> {
            // Drop stale frames sitting in the driver buffer
            for _ in 0..flush_frames {
                capture.grab()?;
            }

            let mut bgr = Mat::default();
            if !capture.read(&mut bgr)? || bgr.empty() {
                return Ok(None);
            }

            let mut rgb = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

            let (cols, rows) = (rgb.cols() as u32, rgb.rows() as u32);
            let bytes = rgb.data_bytes()?.to_vec();
            Ok(image::RgbImage::from_raw(cols, rows, bytes))
        }
    }

    impl FrameSource for CameraSource {
        fn capture(&mut self) -> Option<Frame> {
            let capture = self.capture.as_mut()?;
            let flush = frames_to_flush(self.last_read, Instant::now(), self.flush_frames);
            let result = Self::read_rgb(capture, flush);
            self.last_read = Some(Instant::now());
            match result {
                Ok(Some(image)) => {
                    let frame = Frame::new(image, self.next_sequence);
                    self.next_sequence += 1;
                    Some(frame)
                }
                Ok(None) => {
                    warn!("Camera {} returned an empty frame", self.camera_id);
                    None
                }
                Err(e) => {
                    error!("Camera {} read error: {}", self.camera_id, e);
                    None
                }
            }
        }

        fn release(&mut self) {
            if let Some(mut capture) = self.capture.take() {
                if let Err(e) = capture.release() {
                    warn!("Failed to release camera {}: {}", self.camera_id, e);
                }
                info!("Camera {} released", self.camera_id);
            }
        }

        fn describe(&self) -> String {
            format!("camera {}", self.camera_id)
        }
    }

    impl Drop for CameraSource {
        fn drop(&mut self) {
            self.release();
        }
    }
}
