//! Box-aware image transform: horizontal flip, scale and shift about the image
//! center, then contrast and brightness.
//!
//! The geometric part is one affine [`Projection`]; images are warped with it
//! and boxes are mapped through the same matrix, so both stay in step.
use crate::dataset::{PixelBox, YoloBox};
use image::{imageops, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use rand::Rng;

const FILL: Rgb<u8> = Rgb([0, 0, 0]);

/// One sampled set of transform parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub flip: bool,
    pub scale: f32,
    /// Shift as a fraction of width/height.
    pub shift_x: f32,
    pub shift_y: f32,
    /// Added to every channel.
    pub brightness: i32,
    /// Contrast change in percent; 0 keeps the image as is.
    pub contrast: f32,
}

impl Transform {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            flip: rng.gen_bool(0.5),
            scale: rng.gen_range(0.8..1.2),
            shift_x: rng.gen_range(-0.1..0.1),
            shift_y: rng.gen_range(-0.1..0.1),
            brightness: rng.gen_range(-30..=30),
            contrast: rng.gen_range(-20.0..20.0),
        }
    }

    /// Row-major affine matrix taking source pixels to output pixels.
    fn matrix(&self, width: f32, height: f32) -> [f32; 9] {
        let (cx, cy) = (width / 2.0, height / 2.0);
        let (sx, origin) = if self.flip {
            (-self.scale, width)
        } else {
            (self.scale, 0.0)
        };
        let tx = self.scale * (origin - cx) + cx + self.shift_x * width;
        let ty = cy - self.scale * cy + self.shift_y * height;
        [sx, 0.0, tx, 0.0, self.scale, ty, 0.0, 0.0, 1.0]
    }

    fn map_point(&self, x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
        let m = self.matrix(width, height);
        (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
    }

    /// Transform an image; output keeps the input size and uncovered pixels
    /// are black.
    pub fn apply_image(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let warped = match Projection::from_matrix(self.matrix(width as f32, height as f32)) {
            Some(projection) => warp(image, &projection, Interpolation::Nearest, FILL),
            None => image.clone(),
        };
        let adjusted = imageops::contrast(&warped, self.contrast);
        imageops::brighten(&adjusted, self.brightness)
    }

    /// Transform a box; `None` when it leaves the image entirely.
    pub fn apply_box(&self, bbox: &PixelBox, width: u32, height: u32) -> Option<PixelBox> {
        let (w, h) = (width as f32, height as f32);
        let (x0, y0) = self.map_point(bbox.xmin, bbox.ymin, w, h);
        let (x1, y1) = self.map_point(bbox.xmax, bbox.ymax, w, h);
        PixelBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)).clip(width, height)
    }

    /// Transform normalized labels, dropping boxes pushed out of frame.
    pub fn apply_labels(&self, labels: &[YoloBox], width: u32, height: u32) -> Vec<YoloBox> {
        labels
            .iter()
            .filter_map(|label| {
                let moved = self.apply_box(&label.to_pixel(width, height), width, height)?;
                Some(YoloBox::from_pixel(label.class_id, &moved, width, height))
            })
            .collect()
    }
}
