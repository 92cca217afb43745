//! Run configuration: defaults, external command resolution, and validation.
use crate::dataset::RunMode;
use crate::error::PipelineError;
use crate::external::{resolve_program, DetectorThresholds};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_IMAGE_THRESHOLD: usize = 100;
pub const DEFAULT_NUMBER_AUG: usize = 3;
pub const DEFAULT_EPOCHS: u32 = 69;
pub const DEFAULT_MAP_THRESHOLD: f64 = 0.5;
pub const DEFAULT_INFERENCE_THRESHOLD: f32 = 0.3;
pub const DEFAULT_CAMERA_RANGE: u32 = 5;
pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_DEVICE: &str = "cpu";

pub const CAMERA_COMMAND_ENV: &str = "AUTOTRAIN_CAMERA_COMMAND";
pub const DETECTOR_COMMAND_ENV: &str = "AUTOTRAIN_DETECTOR_COMMAND";
pub const TRAINER_COMMAND_ENV: &str = "AUTOTRAIN_TRAINER_COMMAND";
pub const PREDICTOR_COMMAND_ENV: &str = "AUTOTRAIN_PREDICTOR_COMMAND";

pub const DEFAULT_DETECTOR_COMMAND: &str = "autotrain-detector";
pub const DEFAULT_TRAINER_COMMAND: &str = "autotrain-trainer";
pub const DEFAULT_PREDICTOR_COMMAND: &str = "autotrain-predictor";

/// Pick a command line: explicit flag, then environment, then default.
pub fn resolve_command(flag: Option<&str>, env_var: &str, default: &str) -> String {
    if let Some(command) = flag.map(str::trim).filter(|c| !c.is_empty()) {
        return command.to_string();
    }
    match std::env::var(env_var) {
        Ok(command) if !command.trim().is_empty() => command,
        _ => default.to_string(),
    }
}

/// Command lines for the external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSet {
    /// Capture command template (`{index}` is the device). Ignored when
    /// `camera_dir` replays stills instead.
    pub camera: String,
    pub camera_dir: Option<PathBuf>,
    pub detector: String,
    pub trainer: String,
    pub predictor: String,
}

impl CommandSet {
    /// Check that every program the run will start is on `PATH`.
    pub fn check_programs(&self, inference: bool) -> Result<()> {
        if self.camera_dir.is_none() {
            resolve_program("camera", &self.camera)?;
        }
        resolve_program("detector", &self.detector)?;
        resolve_program("trainer", &self.trainer)?;
        if inference {
            resolve_program("predictor", &self.predictor)?;
        }
        Ok(())
    }
}

fn fail(message: String) -> Result<()> {
    Err(PipelineError::Configuration(message).into())
}

/// Everything one pipeline run consumes; snapshotted into the working folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: RunMode,
    pub data_root: PathBuf,
    /// Annotated dataset to import (bootstrap).
    pub prior_data: Option<PathBuf>,
    pub foreign: bool,
    pub class_list: Option<PathBuf>,
    pub import_overlay: bool,
    /// Earlier working folder to extend (incremental).
    pub prior_run: Option<PathBuf>,
    pub object: Option<String>,
    pub class_name: Option<String>,
    pub image_threshold: usize,
    pub number_aug: usize,
    pub epochs: u32,
    pub map_threshold: f64,
    pub inference: bool,
    pub inference_threshold: f32,
    pub thresholds: DetectorThresholds,
    pub camera_range: u32,
    pub camera: Option<u32>,
    pub device: String,
    pub split_ratio: f64,
    pub seed: Option<u64>,
    pub commands: CommandSet,
}

impl RunConfig {
    /// Reject settings the selected mode cannot run with.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            RunMode::Bootstrap => {
                let Some(prior) = &self.prior_data else {
                    return fail("bootstrap runs require --prior-data".to_string());
                };
                if !prior.is_dir() {
                    return fail(format!("prior data folder {} does not exist", prior.display()));
                }
                if !self.foreign && self.class_list.is_none() {
                    return fail(
                        "--class-list is required unless --foreign is set".to_string(),
                    );
                }
            }
            RunMode::Incremental => {
                if self.prior_data.is_some() {
                    return fail("--prior-data is only used by bootstrap runs".to_string());
                }
                if let Some(prior) = &self.prior_run {
                    if !prior.is_dir() {
                        return fail(format!("prior run {} does not exist", prior.display()));
                    }
                }
            }
        }
        if self.image_threshold == 0 {
            return fail("--image-threshold must be at least 1".to_string());
        }
        if self.camera_range == 0 {
            return fail("--camera-range must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.map_threshold) {
            return fail(format!("--map-threshold {} is outside [0, 1]", self.map_threshold));
        }
        for (name, value) in [
            ("--inference-threshold", self.inference_threshold),
            ("--box-threshold", self.thresholds.box_threshold),
            ("--text-threshold", self.thresholds.text_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return fail(format!("{name} {value} is outside [0, 1]"));
            }
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return fail(format!("split ratio {} is outside (0, 1)", self.split_ratio));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config(mode: RunMode, data_root: PathBuf) -> RunConfig {
    RunConfig {
        mode,
        data_root,
        prior_data: None,
        foreign: true,
        class_list: None,
        import_overlay: true,
        prior_run: None,
        object: Some("Red Mug".to_string()),
        class_name: Some("mug".to_string()),
        image_threshold: 3,
        number_aug: 2,
        epochs: 1,
        map_threshold: DEFAULT_MAP_THRESHOLD,
        inference: false,
        inference_threshold: DEFAULT_INFERENCE_THRESHOLD,
        thresholds: DetectorThresholds::default(),
        camera_range: DEFAULT_CAMERA_RANGE,
        camera: None,
        device: DEFAULT_DEVICE.to_string(),
        split_ratio: crate::train::DEFAULT_SPLIT_RATIO,
        seed: Some(5),
        commands: CommandSet {
            camera: crate::camera::DEFAULT_CAMERA_COMMAND.to_string(),
            camera_dir: None,
            detector: DEFAULT_DETECTOR_COMMAND.to_string(),
            trainer: DEFAULT_TRAINER_COMMAND.to_string(),
            predictor: DEFAULT_PREDICTOR_COMMAND.to_string(),
        },
    }
}
