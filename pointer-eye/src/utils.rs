//! Tensor conversion helpers for the ONNX backends

use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Largest tensor a backend will allocate, in elements
const MAX_TENSOR_ELEMENTS: u64 = 100_000_000;

fn check_target(width: u32, height: u32) -> Result<usize, VisionError> {
    if width == 0 || height == 0 {
        return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
    }
    let elements = width as u64 * height as u64 * 3;
    if elements > MAX_TENSOR_ELEMENTS {
        return Err(VisionError::Processing(format!(
            "Target dimensions {}x{} too large",
            width, height
        )));
    }
    Ok(elements as usize)
}

/// Resize to `width`x`height` and lay out as planar `[3, H, W]` floats in [0, 1]
pub fn rgb_to_chw_tensor(image: &RgbImage, width: u32, height: u32) -> Result<Vec<f32>, VisionError> {
    let elements = check_target(width, height)?;
    let resized = imageops::resize(image, width, height, FilterType::Triangle);

    let plane = (width * height) as usize;
    let mut tensor = vec![0.0f32; elements];
    for (i, pixel) in resized.pixels().enumerate() {
        tensor[i] = pixel[0] as f32 / 255.0;
        tensor[plane + i] = pixel[1] as f32 / 255.0;
        tensor[2 * plane + i] = pixel[2] as f32 / 255.0;
    }
    Ok(tensor)
}

/// Resize to `width`x`height` and lay out as interleaved `[H, W, 3]` floats in [0, 1]
pub fn rgb_to_hwc_tensor(image: &RgbImage, width: u32, height: u32) -> Result<Vec<f32>, VisionError> {
    check_target(width, height)?;
    let resized = imageops::resize(image, width, height, FilterType::Triangle);
    Ok(resized.as_raw().iter().map(|&v| v as f32 / 255.0).collect())
}

/// Map a coordinate from model input space back to frame pixels, truncating
pub fn rescale(value: f32, input_size: u32, frame_size: u32) -> i32 {
    if input_size == 0 || !value.is_finite() {
        return 0;
    }
    (value * frame_size as f32 / input_size as f32) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_chw_layout() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
        let tensor = rgb_to_chw_tensor(&image, 2, 2).unwrap();
        assert_eq!(tensor.len(), 12);
        assert!(tensor[..4].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(tensor[4..8].iter().all(|&v| v.abs() < 1e-6));
        assert!(tensor[8..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_hwc_layout() {
        let image = RgbImage::from_pixel(3, 3, Rgb([255, 0, 0]));
        let tensor = rgb_to_hwc_tensor(&image, 2, 2).unwrap();
        assert_eq!(tensor.len(), 12);
        assert_eq!(&tensor[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_target_rejected() {
        let image = RgbImage::new(2, 2);
        assert!(rgb_to_chw_tensor(&image, 0, 2).is_err());
        assert!(rgb_to_hwc_tensor(&image, 2, 0).is_err());
    }

    #[test]
    fn test_rescale_truncates() {
        assert_eq!(rescale(480.0, 960, 640), 320);
        assert_eq!(rescale(481.0, 960, 640), 320);
        assert_eq!(rescale(f32::NAN, 960, 640), 0);
    }
}
