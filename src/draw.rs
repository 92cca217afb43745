//! Box overlays drawn onto frames for operator feedback.
use crate::dataset::PixelBox;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

pub const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const OVERLAY_THICKNESS: u32 = 2;

/// Draw the outline of `bbox`, clipped to the image. Thicker outlines grow
/// inwards so they never cover pixels outside the box.
pub fn draw_box(image: &mut RgbImage, bbox: &PixelBox, color: Rgb<u8>, thickness: u32) {
    let (width, height) = image.dimensions();
    let Some(clipped) = bbox.clip(width, height) else {
        return;
    };
    let x0 = clipped.xmin as u32;
    let y0 = clipped.ymin as u32;
    let x1 = (clipped.xmax as u32).min(width - 1);
    let y1 = (clipped.ymax as u32).min(height - 1);
    let (box_w, box_h) = (x1 - x0 + 1, y1 - y0 + 1);

    for t in 0..thickness {
        let inset = 2 * t;
        if inset >= box_w || inset >= box_h {
            break;
        }
        let rect = Rect::at((x0 + t) as i32, (y0 + t) as i32).of_size(box_w - inset, box_h - inset);
        draw_hollow_rect_mut(image, rect, color);
    }
}
