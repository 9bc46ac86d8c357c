//! Captured camera frames

use image::RgbImage;
use std::time::Instant;

/// One captured image plus its position in capture order
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Monotonic capture counter, starting at 1 for the first frame of a session
    pub sequence: u64,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Black frame of the given size, mostly useful for synthetic pipelines
    pub fn blank(width: u32, height: u32, sequence: u64) -> Self {
        Self::new(RgbImage::new(width, height), sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_dimensions() {
        let frame = Frame::blank(640, 480, 3);
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence, 3);
    }
}
