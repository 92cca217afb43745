//! Adapters for the external collaborators: detector, trainer, predictor.
mod detector;
mod process;
mod trainer;

pub use detector::{
    normalize_phrase, top_detection, CommandDetector, Detection, Detector, DetectorThresholds,
};
pub use process::{resolve_program, split_command};
pub use trainer::{
    CommandPredictorFactory, CommandTrainer, Predictor, PredictorFactory, TrainReport,
    TrainRequest, Trainer,
};
