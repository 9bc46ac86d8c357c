//! Live display of the annotated feed

use crate::error::VisionError;
use crate::overlay::Overlay;
use image::RgbImage;
use tracing::{debug, warn};

/// Shows annotated frames. `close` is idempotent.
pub trait FrameDisplay: Send {
    /// `image` already carries the drawn overlay; `overlay` is passed for text
    fn show(&mut self, image: &RgbImage, overlay: &Overlay) -> Result<(), VisionError>;

    fn close(&mut self);
}

/// No window; counts frames for diagnostics
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frames_shown: u64,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, _image: &RgbImage, _overlay: &Overlay) -> Result<(), VisionError> {
        self.frames_shown += 1;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!("Headless display closed after {} frames", self.frames_shown);
        }
    }
}

/// A window when requested and compiled in, headless otherwise
pub fn open_display(enabled: bool) -> Result<Box<dyn FrameDisplay>, VisionError> {
    if !enabled {
        return Ok(Box::new(HeadlessDisplay::new()));
    }

    #[cfg(feature = "camera")]
    {
        Ok(Box::new(highgui::HighGuiDisplay::open(highgui::WINDOW_NAME)?))
    }

    #[cfg(not(feature = "camera"))]
    {
        warn!("Display requested but window support was not compiled in, running headless");
        Ok(Box::new(HeadlessDisplay::new()))
    }
}

#[cfg(feature = "camera")]
pub use highgui::HighGuiDisplay;

#[cfg(feature = "camera")]
mod highgui {
    use super::*;
    use opencv::{
        core::{Mat, Point as CvPoint, Scalar, CV_8UC3},
        highgui as cv_highgui, imgproc,
        prelude::*,
    };
    use tracing::info;

    pub const WINDOW_NAME: &str = "Object Pointer";

    /// OpenCV HighGUI window
    pub struct HighGuiDisplay {
        window: String,
        open: bool,
    }

    impl HighGuiDisplay {
        pub fn open(window: &str) -> Result<Self, VisionError> {
            cv_highgui::named_window(window, cv_highgui::WINDOW_AUTOSIZE)
                .map_err(|e| VisionError::Display(format!("Failed to create window: {}", e)))?;
            info!("Display window {:?} opened", window);
            Ok(Self {
                window: window.to_string(),
                open: true,
            })
        }

        fn to_bgr(image: &RgbImage) -> Result<Mat, VisionError> {
            let mut rgb = Mat::new_rows_cols_with_default(
                image.height() as i32,
                image.width() as i32,
                CV_8UC3,
                Scalar::all(0.0),
            )?;
            rgb.data_bytes_mut()?.copy_from_slice(image.as_raw());

            let mut bgr = Mat::default();
            imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
            Ok(bgr)
        }
    }

    impl FrameDisplay for HighGuiDisplay {
        fn show(&mut self, image: &RgbImage, overlay: &Overlay) -> Result<(), VisionError> {
            if !self.open {
                return Ok(());
            }
            let mut bgr = Self::to_bgr(image)?;

            if let (Some(label), Some(anchor)) = (overlay.label(), overlay.label_anchor()) {
                imgproc::put_text(
                    &mut bgr,
                    label,
                    CvPoint::new(anchor.x, anchor.y),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    0.6,
                    Scalar::new(255.0, 0.0, 0.0, 0.0),
                    2,
                    imgproc::LINE_8,
                    false,
                )?;
            }

            cv_highgui::imshow(&self.window, &bgr)?;
            cv_highgui::wait_key(1)?;
            Ok(())
        }

        fn close(&mut self) {
            if self.open {
                self.open = false;
                if let Err(e) = cv_highgui::destroy_window(&self.window) {
                    warn!("Failed to close window {:?}: {}", self.window, e);
                }
            }
        }
    }

    impl Drop for HighGuiDisplay {
        fn drop(&mut self) {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_counts_and_closes() {
        let mut display = HeadlessDisplay::new();
        let image = RgbImage::new(4, 4);
        display.show(&image, &Overlay::default()).unwrap();
        display.show(&image, &Overlay::default()).unwrap();
        assert_eq!(display.frames_shown(), 2);
        display.close();
        display.close();
        assert!(display.is_closed());
    }

    #[test]
    fn test_disabled_display_is_headless() {
        let mut display = open_display(false).unwrap();
        assert!(display.show(&RgbImage::new(2, 2), &Overlay::default()).is_ok());
        display.close();
    }
}
