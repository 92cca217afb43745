//! Split, training-config emission, trainer invocation and the acceptance
//! gate.
mod inference;
mod split;

pub use inference::{run_inference, InferenceSummary};
pub use split::{split_dataset, SplitSummary, DEFAULT_SPLIT_RATIO};

use crate::dataset::{write_atomic, SplitPart, WorkingPaths};
use crate::external::{TrainReport, TrainRequest, Trainer};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The `train.yaml` document handed to the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Dataset root; `train` and `val` are relative to it.
    pub path: PathBuf,
    pub train: String,
    pub val: String,
    pub names: BTreeMap<usize, String>,
}

impl TrainingConfig {
    pub fn for_working_folder(root: &Path, labels: &[String]) -> Self {
        Self {
            path: root.to_path_buf(),
            train: format!("split_dataset/{}", SplitPart::Train.as_str()),
            val: format!("split_dataset/{}", SplitPart::Val.as_str()),
            names: labels.iter().cloned().enumerate().collect(),
        }
    }
}

/// Emit `train.yaml` unless it already exists. Returns whether it was written.
pub fn write_training_config(paths: &WorkingPaths, labels: &[String]) -> Result<bool> {
    let config_path = paths.train_config_path();
    if config_path.exists() {
        tracing::debug!(path = %config_path.display(), "training config already present");
        return Ok(false);
    }
    let root = fs::canonicalize(paths.root())
        .with_context(|| format!("resolve {}", paths.root().display()))?;
    let config = TrainingConfig::for_working_folder(&root, labels);
    let text = serde_yaml::to_string(&config).context("serialize training config")?;
    write_atomic(&config_path, text.as_bytes())?;
    tracing::info!(path = %config_path.display(), classes = labels.len(), "wrote training config");
    Ok(true)
}

/// Result of the acceptance gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainVerdict {
    Accepted { weights: PathBuf, metric: f64 },
    /// Below threshold: the artifact is discarded.
    Rejected { metric: f64 },
}

impl TrainVerdict {
    /// Accepts when `metric >= threshold`.
    pub fn judge(report: &TrainReport, threshold: f64) -> Result<Self> {
        let metric = report
            .gating_metric()
            .ok_or_else(|| anyhow!("trainer reported no average precision"))?;
        Ok(if metric >= threshold {
            TrainVerdict::Accepted {
                weights: report.weights_path(),
                metric,
            }
        } else {
            TrainVerdict::Rejected { metric }
        })
    }

    pub fn weights(&self) -> Option<&Path> {
        match self {
            TrainVerdict::Accepted { weights, .. } => Some(weights),
            TrainVerdict::Rejected { .. } => None,
        }
    }

    pub fn metric(&self) -> f64 {
        match self {
            TrainVerdict::Accepted { metric, .. } | TrainVerdict::Rejected { metric } => *metric,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub epochs: u32,
    pub device: String,
    pub map_threshold: f64,
    pub split_ratio: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub split: SplitSummary,
    pub verdict: TrainVerdict,
}

/// Split, emit the config, train, and gate.
pub fn train_and_gate(
    paths: &WorkingPaths,
    labels: &[String],
    trainer: &mut dyn Trainer,
    settings: &TrainSettings,
) -> Result<TrainingOutcome> {
    let split = split_dataset(paths, settings.split_ratio, settings.seed)?;
    write_training_config(paths, labels)?;

    let config_path = paths.train_config_path();
    let request = TrainRequest {
        config_path: &config_path,
        epochs: settings.epochs,
        device: &settings.device,
        project_dir: paths.root(),
    };
    let report = trainer.train(&request).context("train model")?;
    let verdict = TrainVerdict::judge(&report, settings.map_threshold)?;
    match &verdict {
        TrainVerdict::Accepted { weights, metric } => tracing::info!(
            metric,
            weights = %weights.display(),
            "trained artifact accepted"
        ),
        TrainVerdict::Rejected { metric } => tracing::warn!(
            metric,
            threshold = settings.map_threshold,
            "trained artifact rejected; capture more images or train more epochs"
        ),
    }
    Ok(TrainingOutcome { split, verdict })
}
