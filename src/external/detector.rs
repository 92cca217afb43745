//! Zero-shot detector seam.
//!
//! The detector is a black box: frame + natural-language phrase in, boxes with
//! labels and scores out, boxes in absolute pixel coordinates.
use super::process::JsonLinesWorker;
use crate::dataset::PixelBox;
use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

/// Box and text confidence thresholds forwarded to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorThresholds {
    pub box_threshold: f32,
    pub text_threshold: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            box_threshold: 0.6,
            text_threshold: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: PixelBox,
    pub label: String,
    pub score: f32,
}

impl Detection {
    pub fn new(bbox: PixelBox, label: &str, score: f32) -> Self {
        Self {
            bbox,
            label: label.to_string(),
            score,
        }
    }
}

pub trait Detector {
    fn detect(
        &mut self,
        frame: &RgbImage,
        phrase: &str,
        thresholds: DetectorThresholds,
    ) -> Result<Vec<Detection>>;
}

/// Keep the single highest-scoring detection at or above `min_score`.
pub fn top_detection(detections: Vec<Detection>, min_score: f32) -> Option<Detection> {
    detections
        .into_iter()
        .filter(|detection| detection.score >= min_score)
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

/// Grounded detectors expect a lowercase phrase terminated by a period.
pub fn normalize_phrase(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('.').trim().to_lowercase();
    format!("{trimmed}.")
}

/// Wire form shared by detector and predictor workers.
#[derive(Debug, Deserialize)]
pub(crate) struct WireDetections {
    #[serde(default)]
    detections: Vec<WireDetection>,
}

#[derive(Debug, Deserialize)]
struct WireDetection {
    #[serde(rename = "box")]
    bbox: [f32; 4],
    #[serde(default)]
    label: String,
    #[serde(default)]
    score: f32,
}

impl WireDetections {
    pub(crate) fn into_detections(self) -> Vec<Detection> {
        self.detections
            .into_iter()
            .map(|wire| {
                let [xmin, ymin, xmax, ymax] = wire.bbox;
                Detection::new(
                    PixelBox::new(xmin, ymin, xmax, ymax),
                    &wire.label,
                    wire.score,
                )
            })
            .collect()
    }
}

/// Write a frame to a temp PNG the worker can open. Dropping the handle
/// deletes the file.
pub(crate) fn stage_frame(frame: &RgbImage) -> Result<tempfile::NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("autotrain-frame-")
        .suffix(".png")
        .tempfile()
        .context("create temp frame")?;
    frame
        .save_with_format(file.path(), ImageFormat::Png)
        .with_context(|| format!("write temp frame {}", file.path().display()))?;
    Ok(file)
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    image: String,
    phrase: &'a str,
    box_threshold: f32,
    text_threshold: f32,
}

/// Detector backed by a long-lived worker command, started on first use.
pub struct CommandDetector {
    command: String,
    worker: Option<JsonLinesWorker>,
}

impl CommandDetector {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            worker: None,
        }
    }

    fn worker(&mut self) -> Result<&mut JsonLinesWorker> {
        if self.worker.is_none() {
            self.worker = Some(JsonLinesWorker::spawn("detector", &self.command, &[])?);
        }
        self.worker
            .as_mut()
            .ok_or_else(|| anyhow!("detector worker is not running"))
    }
}

impl Detector for CommandDetector {
    fn detect(
        &mut self,
        frame: &RgbImage,
        phrase: &str,
        thresholds: DetectorThresholds,
    ) -> Result<Vec<Detection>> {
        let staged = stage_frame(frame)?;
        let request = DetectRequest {
            image: staged.path().to_string_lossy().to_string(),
            phrase,
            box_threshold: thresholds.box_threshold,
            text_threshold: thresholds.text_threshold,
        };
        let response: WireDetections = self.worker()?.request(&request)?;
        Ok(response.into_detections())
    }
}
