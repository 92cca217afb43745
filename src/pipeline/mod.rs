//! Top-level orchestration of a bootstrap or incremental run.
mod config;
mod report;
mod run;

pub use config::{
    resolve_command, CommandSet, RunConfig, CAMERA_COMMAND_ENV, DEFAULT_CAMERA_RANGE,
    DEFAULT_DATA_ROOT, DEFAULT_DEVICE, DEFAULT_DETECTOR_COMMAND, DEFAULT_EPOCHS,
    DEFAULT_IMAGE_THRESHOLD, DEFAULT_INFERENCE_THRESHOLD, DEFAULT_MAP_THRESHOLD,
    DEFAULT_NUMBER_AUG, DEFAULT_PREDICTOR_COMMAND, DEFAULT_TRAINER_COMMAND,
    DETECTOR_COMMAND_ENV, PREDICTOR_COMMAND_ENV, TRAINER_COMMAND_ENV,
};
pub use report::{RunReport, RunStatus};
pub use run::{run_pipeline, Collaborators};
