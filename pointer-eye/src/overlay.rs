//! Annotation of the live feed

use image::{Rgb, RgbImage};
use pointer_core::{BoundingBox, DetectionResult, Point};

pub const FINGERTIP_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const FINGERTIP_RADIUS: i32 = 10;
pub const BOX_THICKNESS: i32 = 2;
/// Label baseline distance above the box
pub const LABEL_OFFSET: i32 = 10;

/// What to draw on top of one displayed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub fingertip: Option<Point>,
    pub pointed: Option<(BoundingBox, String)>,
}

impl Overlay {
    pub fn from_result(result: Option<&DetectionResult>) -> Self {
        let Some(result) = result else {
            return Self::default();
        };
        Self {
            fingertip: result.fingertip,
            pointed: result
                .pointed
                .as_ref()
                .map(|p| (p.bbox(), p.label().to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fingertip.is_none() && self.pointed.is_none()
    }

    pub fn label(&self) -> Option<&str> {
        self.pointed.as_ref().map(|(_, label)| label.as_str())
    }

    /// Where the label text starts
    pub fn label_anchor(&self) -> Option<Point> {
        self.pointed
            .as_ref()
            .map(|(bbox, _)| Point::new(bbox.x1, bbox.y1 - LABEL_OFFSET))
    }

    /// Draw the fingertip marker and the box outline. Text is left to the display.
    pub fn draw(&self, image: &mut RgbImage) {
        if let Some(tip) = self.fingertip {
            fill_circle(image, tip, FINGERTIP_RADIUS, FINGERTIP_COLOR);
        }
        if let Some((bbox, _)) = &self.pointed {
            draw_rect(image, bbox, BOX_THICKNESS, BOX_COLOR);
        }
    }
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_circle(image: &mut RgbImage, center: Point, radius: i32, color: Rgb<u8>) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put(image, center.x + dx, center.y + dy, color);
            }
        }
    }
}

fn draw_rect(image: &mut RgbImage, bbox: &BoundingBox, thickness: i32, color: Rgb<u8>) {
    for t in 0..thickness {
        for x in bbox.x1..=bbox.x2 {
            put(image, x, bbox.y1 + t, color);
            put(image, x, bbox.y2 - t, color);
        }
        for y in bbox.y1..=bbox.y2 {
            put(image, bbox.x1 + t, y, color);
            put(image, bbox.x2 - t, y, color);
        }
    }
}
