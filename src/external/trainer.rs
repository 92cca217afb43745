//! Trainer and predictor seams.
//!
//! Training is a single blocking call; its report names the run directory and
//! the per-class AP50 values, where index 0 drives the acceptance gate.
use super::detector::{stage_frame, Detection, WireDetections};
use super::process::{run_json_command, JsonLinesWorker};
use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inputs handed to the trainer.
#[derive(Debug, Clone)]
pub struct TrainRequest<'a> {
    pub config_path: &'a Path,
    pub epochs: u32,
    pub device: &'a str,
    pub project_dir: &'a Path,
}

/// Report printed by the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Run directory; weights live under `weights/best.pt`.
    pub save_dir: PathBuf,
    #[serde(default)]
    pub all_ap: Vec<f64>,
}

impl TrainReport {
    pub fn weights_path(&self) -> PathBuf {
        self.save_dir.join("weights").join("best.pt")
    }

    /// The metric used for gating (AP at IoU 0.5, first entry).
    pub fn gating_metric(&self) -> Option<f64> {
        self.all_ap.first().copied()
    }
}

pub trait Trainer {
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainReport>;
}

#[derive(Debug, Clone)]
pub struct CommandTrainer {
    command: String,
}

impl CommandTrainer {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl Trainer for CommandTrainer {
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainReport> {
        let args = vec![
            "--data".to_string(),
            request.config_path.to_string_lossy().to_string(),
            "--epochs".to_string(),
            request.epochs.to_string(),
            "--device".to_string(),
            request.device.to_string(),
            "--project".to_string(),
            request.project_dir.to_string_lossy().to_string(),
        ];
        run_json_command("trainer", &self.command, &args)
    }
}

/// Runs a trained artifact against frames.
pub trait Predictor {
    fn predict(&mut self, frame: &RgbImage, conf: f32) -> Result<Vec<Detection>>;
}

/// Loads a predictor for a weights artifact.
pub trait PredictorFactory {
    fn open(&mut self, weights: &Path) -> Result<Box<dyn Predictor>>;
}

#[derive(Debug, Clone)]
pub struct CommandPredictorFactory {
    command: String,
}

impl CommandPredictorFactory {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl PredictorFactory for CommandPredictorFactory {
    fn open(&mut self, weights: &Path) -> Result<Box<dyn Predictor>> {
        let args = vec![
            "--weights".to_string(),
            weights.to_string_lossy().to_string(),
        ];
        let worker = JsonLinesWorker::spawn("predictor", &self.command, &args)?;
        Ok(Box::new(CommandPredictor { worker }))
    }
}

struct CommandPredictor {
    worker: JsonLinesWorker,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    image: String,
    conf: f32,
}

impl Predictor for CommandPredictor {
    fn predict(&mut self, frame: &RgbImage, conf: f32) -> Result<Vec<Detection>> {
        let staged = stage_frame(frame)?;
        let request = PredictRequest {
            image: staged.path().to_string_lossy().to_string(),
            conf,
        };
        let response: WireDetections = self.worker.request(&request)?;
        Ok(response.into_detections())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_derives_weights_path_and_gating_metric() {
        let report: TrainReport =
            serde_json::from_str(r#"{"save_dir": "runs/train3", "all_ap": [0.55, 0.4]}"#)
                .expect("parse report");
        assert_eq!(
            report.weights_path(),
            PathBuf::from("runs/train3/weights/best.pt")
        );
        assert_eq!(report.gating_metric(), Some(0.55));

        let empty: TrainReport =
            serde_json::from_str(r#"{"save_dir": "runs/x"}"#).expect("parse report");
        assert_eq!(empty.gating_metric(), None);
    }
}
