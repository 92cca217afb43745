//! `run_report.json`: the outcome record of a retained working folder.
use crate::augment::AugmentSummary;
use crate::dataset::RunMode;
use crate::importer::ImportSummary;
use crate::labeler::CaptureSummary;
use crate::train::{InferenceSummary, TrainingOutcome};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub folder: PathBuf,
    pub status: RunStatus,
    pub camera_index: Option<u32>,
    pub phrase: Option<String>,
    pub class_name: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    pub import: Option<ImportSummary>,
    pub carried_forward: Option<usize>,
    pub capture: Option<CaptureSummary>,
    pub augment: Option<AugmentSummary>,
    pub training: Option<TrainingOutcome>,
    pub inference: Option<InferenceSummary>,
    #[serde(default)]
    pub raw_images: usize,
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(mode: RunMode, folder: PathBuf) -> Self {
        Self {
            mode,
            folder,
            status: RunStatus::Running,
            camera_index: None,
            phrase: None,
            class_name: None,
            classes: Vec::new(),
            import: None,
            carried_forward: None,
            capture: None,
            augment: None,
            training: None,
            inference: None,
            raw_images: 0,
            error: None,
        }
    }

    /// Accepted weights, if training passed the gate.
    pub fn weights(&self) -> Option<&std::path::Path> {
        self.training.as_ref().and_then(|t| t.verdict.weights())
    }
}
