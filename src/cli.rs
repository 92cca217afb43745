//! CLI argument parsing for the auto-train workflow.
//!
//! The CLI only collects settings; `RunArgs::to_config` turns them into the
//! typed [`RunConfig`] the pipeline consumes.
use crate::camera::DEFAULT_CAMERA_COMMAND;
use crate::dataset::RunMode;
use crate::external::DetectorThresholds;
use crate::pipeline::{
    resolve_command, CommandSet, RunConfig, CAMERA_COMMAND_ENV, DEFAULT_CAMERA_RANGE,
    DEFAULT_DATA_ROOT, DEFAULT_DETECTOR_COMMAND, DEFAULT_DEVICE, DEFAULT_EPOCHS,
    DEFAULT_IMAGE_THRESHOLD, DEFAULT_INFERENCE_THRESHOLD, DEFAULT_MAP_THRESHOLD,
    DEFAULT_NUMBER_AUG, DEFAULT_PREDICTOR_COMMAND, DEFAULT_TRAINER_COMMAND,
    DETECTOR_COMMAND_ENV, PREDICTOR_COMMAND_ENV, TRAINER_COMMAND_ENV,
};
use crate::train::DEFAULT_SPLIT_RATIO;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "autotrain",
    version,
    about = "Build an object-detection dataset from a live camera and train on it",
    after_help = "Commands:\n  run --mode bootstrap --prior-data <dir> [--foreign | --class-list <yaml>]\n  run --mode incremental [--prior-run <folder>]\n  cameras                              List usable camera indices\n  status --folder <dir>                Summarize a working folder\n\nExamples:\n  autotrain run --mode bootstrap --prior-data exports/mugs --foreign --object \"red mug\"\n  autotrain run --mode incremental --prior-run data/bootstrap_v20240101120000\n  autotrain status --folder data/incremental_v20240102090000 --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(Box<RunArgs>),
    Cameras(CamerasArgs),
    Status(StatusArgs),
}

/// Camera backend flags shared by `run` and `cameras`.
#[derive(clap::Args, Debug, Clone)]
pub struct CameraArgs {
    /// Capture command template; `{index}` is replaced by the device index
    /// [env: AUTOTRAIN_CAMERA_COMMAND]
    #[arg(long, value_name = "CMD")]
    pub camera_command: Option<String>,

    /// Replay still images from <DIR>/<index>/ instead of opening devices
    #[arg(long, value_name = "DIR")]
    pub camera_dir: Option<PathBuf>,

    /// Probe camera indices 0..N
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CAMERA_RANGE)]
    pub camera_range: u32,
}

impl CameraArgs {
    pub fn camera_command(&self) -> String {
        resolve_command(
            self.camera_command.as_deref(),
            CAMERA_COMMAND_ENV,
            DEFAULT_CAMERA_COMMAND,
        )
    }
}

/// Run one bootstrap or incremental pipeline.
#[derive(Parser, Debug)]
#[command(about = "Capture, label, augment and train one new class")]
pub struct RunArgs {
    /// bootstrap imports prior data first; incremental extends a prior run
    #[arg(long, value_enum)]
    pub mode: RunMode,

    /// Annotated dataset to import (bootstrap)
    #[arg(long, value_name = "DIR")]
    pub prior_data: Option<PathBuf>,

    /// Prior data is a foreign export with its class list alongside
    #[arg(long)]
    pub foreign: bool,

    /// Class-list YAML for curated prior data
    #[arg(long, value_name = "YAML")]
    pub class_list: Option<PathBuf>,

    /// Do not draw imported boxes onto foreign images
    #[arg(long)]
    pub no_import_overlay: bool,

    /// Earlier working folder whose classes and raw data to extend (incremental)
    #[arg(long, value_name = "DIR")]
    pub prior_run: Option<PathBuf>,

    /// Detector query phrase; prompted for when omitted
    #[arg(long, value_name = "PHRASE")]
    pub object: Option<String>,

    /// Short class name stored after capture; prompted for when omitted
    #[arg(long, value_name = "NAME")]
    pub class_name: Option<String>,

    /// Accepted frames after which capture stops
    #[arg(long, default_value_t = DEFAULT_IMAGE_THRESHOLD)]
    pub image_threshold: usize,

    /// Augmented variants per raw image
    #[arg(long, default_value_t = DEFAULT_NUMBER_AUG)]
    pub number_aug: usize,

    #[arg(long, default_value_t = DEFAULT_EPOCHS)]
    pub epochs: u32,

    /// Minimum AP50 for the trained weights to be accepted
    #[arg(long, default_value_t = DEFAULT_MAP_THRESHOLD)]
    pub map_threshold: f64,

    /// Run live inference with accepted weights
    #[arg(long)]
    pub inference: bool,

    /// Confidence threshold for live inference
    #[arg(long, default_value_t = DEFAULT_INFERENCE_THRESHOLD)]
    pub inference_threshold: f32,

    /// Detector box-confidence threshold
    #[arg(long, default_value_t = DetectorThresholds::default().box_threshold)]
    pub box_threshold: f32,

    /// Detector text-confidence threshold
    #[arg(long, default_value_t = DetectorThresholds::default().text_threshold)]
    pub text_threshold: f32,

    /// Preferred camera index when several are available
    #[arg(long, value_name = "INDEX")]
    pub camera: Option<u32>,

    #[command(flatten)]
    pub camera_args: CameraArgs,

    /// Zero-shot detector worker command [env: AUTOTRAIN_DETECTOR_COMMAND]
    #[arg(long, value_name = "CMD")]
    pub detector_command: Option<String>,

    /// Trainer command [env: AUTOTRAIN_TRAINER_COMMAND]
    #[arg(long, value_name = "CMD")]
    pub trainer_command: Option<String>,

    /// Predictor worker command for live inference [env: AUTOTRAIN_PREDICTOR_COMMAND]
    #[arg(long, value_name = "CMD")]
    pub predictor_command: Option<String>,

    /// Compute device passed to the trainer
    #[arg(long, default_value = DEFAULT_DEVICE)]
    pub device: String,

    /// Directory holding working folders
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DATA_ROOT)]
    pub data_root: PathBuf,

    /// Seed for augmentation and the train/val split
    #[arg(long)]
    pub seed: Option<u64>,

    /// Emit debug logging
    #[arg(long)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn to_config(&self) -> RunConfig {
        RunConfig {
            mode: self.mode,
            data_root: self.data_root.clone(),
            prior_data: self.prior_data.clone(),
            foreign: self.foreign,
            class_list: self.class_list.clone(),
            import_overlay: !self.no_import_overlay,
            prior_run: self.prior_run.clone(),
            object: self.object.clone(),
            class_name: self.class_name.clone(),
            image_threshold: self.image_threshold,
            number_aug: self.number_aug,
            epochs: self.epochs,
            map_threshold: self.map_threshold,
            inference: self.inference,
            inference_threshold: self.inference_threshold,
            thresholds: DetectorThresholds {
                box_threshold: self.box_threshold,
                text_threshold: self.text_threshold,
            },
            camera_range: self.camera_args.camera_range,
            camera: self.camera,
            device: self.device.clone(),
            split_ratio: DEFAULT_SPLIT_RATIO,
            seed: self.seed,
            commands: CommandSet {
                camera: self.camera_args.camera_command(),
                camera_dir: self.camera_args.camera_dir.clone(),
                detector: resolve_command(
                    self.detector_command.as_deref(),
                    DETECTOR_COMMAND_ENV,
                    DEFAULT_DETECTOR_COMMAND,
                ),
                trainer: resolve_command(
                    self.trainer_command.as_deref(),
                    TRAINER_COMMAND_ENV,
                    DEFAULT_TRAINER_COMMAND,
                ),
                predictor: resolve_command(
                    self.predictor_command.as_deref(),
                    PREDICTOR_COMMAND_ENV,
                    DEFAULT_PREDICTOR_COMMAND,
                ),
            },
        }
    }
}

/// List usable camera devices.
#[derive(Parser, Debug)]
#[command(about = "List camera indices that open and produce a frame")]
pub struct CamerasArgs {
    #[command(flatten)]
    pub camera_args: CameraArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Emit debug logging
    #[arg(long)]
    pub verbose: bool,
}

/// Summarize a working folder.
#[derive(Parser, Debug)]
#[command(about = "Summarize a working folder's classes, counts and last outcome")]
pub struct StatusArgs {
    /// Working folder created by `run`
    #[arg(long, value_name = "DIR")]
    pub folder: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Emit debug logging
    #[arg(long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        RootArgs::command().debug_assert();
    }

    #[test]
    fn run_defaults_follow_the_documented_values() {
        let root = RootArgs::parse_from([
            "autotrain",
            "run",
            "--mode",
            "incremental",
            "--detector-command",
            "det",
            "--trainer-command",
            "train",
            "--camera-command",
            "cam {index}",
        ]);
        let Command::Run(args) = root.command else {
            panic!("expected run");
        };
        let config = args.to_config();
        assert_eq!(config.mode, RunMode::Incremental);
        assert_eq!(config.image_threshold, 100);
        assert_eq!(config.number_aug, 3);
        assert_eq!(config.epochs, 69);
        assert_eq!(config.map_threshold, 0.5);
        assert_eq!(config.thresholds, DetectorThresholds::default());
        assert_eq!(config.camera_range, 5);
        assert_eq!(config.data_root, PathBuf::from("data"));
        assert_eq!(config.commands.detector, "det");
        assert_eq!(config.commands.camera, "cam {index}");
        assert!(config.import_overlay);
    }
}
