//! YOLO label files: one `class_id xc yc w h` line per box, geometry
//! normalized to fractions of the image size.
use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Axis-aligned box in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl PixelBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Clip to `[0, width] x [0, height]`.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelBox> {
        let (w, h) = (width as f32, height as f32);
        let clipped = PixelBox {
            xmin: self.xmin.clamp(0.0, w),
            ymin: self.ymin.clamp(0.0, h),
            xmax: self.xmax.clamp(0.0, w),
            ymax: self.ymax.clamp(0.0, h),
        };
        (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped)
    }
}

/// One normalized label line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class_id: usize,
    pub xc: f32,
    pub yc: f32,
    pub w: f32,
    pub h: f32,
}

impl YoloBox {
    /// Normalize a pixel box against a `width x height` frame.
    pub fn from_pixel(class_id: usize, bbox: &PixelBox, width: u32, height: u32) -> Self {
        let (iw, ih) = (width as f32, height as f32);
        Self {
            class_id,
            xc: (bbox.xmin + bbox.xmax) / 2.0 / iw,
            yc: (bbox.ymin + bbox.ymax) / 2.0 / ih,
            w: bbox.width() / iw,
            h: bbox.height() / ih,
        }
    }

    pub fn to_pixel(&self, width: u32, height: u32) -> PixelBox {
        let (iw, ih) = (width as f32, height as f32);
        let (xc, yc, w, h) = (self.xc * iw, self.yc * ih, self.w * iw, self.h * ih);
        PixelBox::new(xc - w / 2.0, yc - h / 2.0, xc + w / 2.0, yc + h / 2.0)
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.xc, self.yc, self.w, self.h
        )
    }

    pub fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!("expected 5 fields, found {}", fields.len()));
        }
        let class_id = fields[0]
            .parse::<usize>()
            .map_err(|err| format!("class id {:?}: {err}", fields[0]))?;
        let mut geometry = [0f32; 4];
        for (slot, raw) in geometry.iter_mut().zip(&fields[1..]) {
            *slot = raw
                .parse::<f32>()
                .map_err(|err| format!("geometry value {raw:?}: {err}"))?;
        }
        let [xc, yc, w, h] = geometry;
        Ok(Self {
            class_id,
            xc,
            yc,
            w,
            h,
        })
    }
}

/// Read every box of a label file. Blank lines are ignored.
pub fn read_label_file(path: &Path) -> Result<Vec<YoloBox>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut boxes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = YoloBox::parse_line(line).map_err(|reason| PipelineError::MalformedLabel {
            label_file: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        boxes.push(parsed);
    }
    Ok(boxes)
}

pub fn write_label_file(path: &Path, boxes: &[YoloBox]) -> Result<()> {
    let mut text = String::new();
    for bbox in boxes {
        text.push_str(&bbox.to_line());
        text.push('\n');
    }
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))
}
