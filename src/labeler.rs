//! Live auto-labeling: capture frames, ask the zero-shot detector for the
//! target phrase, and keep only frames with a positive detection.
//!
//! The loop is an explicit state machine (`Capturing -> Accept | Skip ->
//! Capturing`, terminal `Stopped`). The camera session and the stop-key watch
//! are both scoped, so every exit path releases them.
use crate::camera::{CameraSession, FrameRead};
use crate::dataset::{write_label_file, WorkingPaths, YoloBox};
use crate::draw::{draw_box, OVERLAY_COLOR, OVERLAY_THICKNESS};
use crate::external::{top_detection, Detection, Detector, DetectorThresholds};
use crate::operator::{Operator, StopWatch};
use anyhow::{Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy)]
pub struct LabelerConfig {
    /// Accepted frames after which capture stops.
    pub image_threshold: usize,
    pub thresholds: DetectorThresholds,
    /// Draw the detected box onto the stored frame.
    pub draw_overlay: bool,
}

/// Why the capture loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ThresholdReached,
    OperatorStop,
    CameraEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub accepted: usize,
    pub skipped: usize,
    pub unreadable: usize,
    pub stop: StopReason,
}

enum State {
    Capturing,
    Accept(RgbImage, Detection),
    Skip,
    Stopped(StopReason),
}

/// One labeling session for a single target phrase.
pub struct AutoLabeler<'a> {
    paths: &'a WorkingPaths,
    detector: &'a mut dyn Detector,
    config: LabelerConfig,
    phrase: String,
    class_id: usize,
    counter: usize,
}

impl<'a> AutoLabeler<'a> {
    /// `class_id` is the index of the last manifest entry, the class being
    /// hunted.
    pub fn new(
        paths: &'a WorkingPaths,
        detector: &'a mut dyn Detector,
        config: LabelerConfig,
        phrase: &str,
        class_id: usize,
    ) -> Self {
        Self {
            paths,
            detector,
            config,
            phrase: phrase.to_string(),
            class_id,
            counter: 0,
        }
    }

    /// Run until the threshold, an operator stop, or the end of the stream.
    ///
    /// Takes ownership of `session`; the device is released when this returns,
    /// whether it returns an error or not.
    pub fn run(
        mut self,
        mut session: CameraSession,
        operator: &mut dyn Operator,
    ) -> Result<CaptureSummary> {
        self.paths.ensure_raw_layout()?;
        operator.say(&format!(
            "Capturing '{}' from camera {} (press q or Esc to stop)",
            self.phrase,
            session.index()
        ));
        let mut watch = StopWatch::start(operator)?;
        let mut summary = CaptureSummary {
            accepted: 0,
            skipped: 0,
            unreadable: 0,
            stop: StopReason::ThresholdReached,
        };

        let mut state = State::Capturing;
        loop {
            state = match state {
                State::Capturing => self.capture(&mut session, &mut watch, &mut summary)?,
                State::Accept(frame, detection) => {
                    let image_path = self.store(frame, &detection)?;
                    summary.accepted += 1;
                    tracing::info!(
                        accepted = summary.accepted,
                        threshold = self.config.image_threshold,
                        score = detection.score,
                        image = %self.paths.rel_path(&image_path),
                        "accepted frame"
                    );
                    State::Capturing
                }
                State::Skip => {
                    summary.skipped += 1;
                    State::Capturing
                }
                State::Stopped(reason) => {
                    summary.stop = reason;
                    break;
                }
            };
        }

        watch.say(&format!(
            "Captured {} image(s) for '{}'",
            summary.accepted, self.phrase
        ));
        tracing::info!(
            accepted = summary.accepted,
            skipped = summary.skipped,
            unreadable = summary.unreadable,
            stop = ?summary.stop,
            "capture finished"
        );
        Ok(summary)
    }

    fn capture(
        &mut self,
        session: &mut CameraSession,
        watch: &mut StopWatch<'_>,
        summary: &mut CaptureSummary,
    ) -> Result<State> {
        if summary.accepted >= self.config.image_threshold {
            return Ok(State::Stopped(StopReason::ThresholdReached));
        }
        if watch.stop_requested()? {
            return Ok(State::Stopped(StopReason::OperatorStop));
        }
        let frame = match session.next_frame()? {
            FrameRead::Frame(frame) => frame,
            FrameRead::Unreadable => {
                summary.unreadable += 1;
                tracing::warn!(camera = session.index(), "skipping unreadable frame");
                return Ok(State::Capturing);
            }
            FrameRead::Ended => {
                tracing::warn!(camera = session.index(), "camera stopped producing frames");
                return Ok(State::Stopped(StopReason::CameraEnded));
            }
        };

        let detections = self
            .detector
            .detect(&frame, &self.phrase, self.config.thresholds)
            .context("run detector")?;
        let (width, height) = frame.dimensions();
        let hit = top_detection(detections, self.config.thresholds.box_threshold).and_then(
            |detection| {
                let bbox = detection.bbox.clip(width, height)?;
                Some(Detection { bbox, ..detection })
            },
        );
        Ok(match hit {
            Some(detection) => State::Accept(frame, detection),
            None => {
                tracing::debug!("no detection above threshold");
                State::Skip
            }
        })
    }

    /// Write the label first, then the image, so an image never lands without
    /// its label.
    fn store(&mut self, mut frame: RgbImage, detection: &Detection) -> Result<PathBuf> {
        let (width, height) = frame.dimensions();
        let (image_path, label_path) = self.next_names();
        let label = YoloBox::from_pixel(self.class_id, &detection.bbox, width, height);
        write_label_file(&label_path, &[label])?;

        if self.config.draw_overlay {
            draw_box(&mut frame, &detection.bbox, OVERLAY_COLOR, OVERLAY_THICKNESS);
        }
        frame
            .save(&image_path)
            .with_context(|| format!("write {}", image_path.display()))?;
        Ok(image_path)
    }

    /// `image_{counter}_{timestamp}`, skipping names already on disk.
    fn next_names(&mut self) -> (PathBuf, PathBuf) {
        let images = self.paths.raw_images_dir();
        let labels = self.paths.raw_labels_dir();
        loop {
            self.counter += 1;
            let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
            let stem = format!("image_{}_{stamp}", self.counter);
            let image_path = images.join(format!("{stem}.jpg"));
            let label_path = labels.join(format!("{stem}.txt"));
            if !image_path.exists() && !label_path.exists() {
                return (image_path, label_path);
            }
        }
    }
}

#[cfg(test)]
#[path = "labeler_tests.rs"]
mod tests;
