//! Read-only summary of a working folder for `autotrain status`.
use crate::dataset::{count_images, SplitPart, WorkingPaths};
use crate::pipeline::{RunReport, RunStatus};
use crate::manifest::ManifestStore;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderStatus {
    pub folder: PathBuf,
    pub candidate_labels: Vec<String>,
    pub camera_index: Option<u32>,
    pub raw_images: usize,
    pub raw_labels: usize,
    pub aug_images: usize,
    pub train_images: usize,
    pub val_images: usize,
    pub train_config: bool,
    /// `status` recorded in `run_report.json`, if the run wrote one.
    pub run_status: Option<RunStatus>,
    pub metric: Option<f64>,
    pub weights: Option<PathBuf>,
}

pub fn folder_status(folder: &Path) -> Result<FolderStatus> {
    if !folder.is_dir() {
        return Err(anyhow!("working folder {} does not exist", folder.display()));
    }
    let paths = WorkingPaths::new(folder.to_path_buf());
    let manifest = ManifestStore::new(paths.manifest_path()).load()?;
    let mut status = FolderStatus {
        folder: folder.to_path_buf(),
        candidate_labels: manifest.candidate_labels,
        camera_index: manifest.camera_index,
        raw_images: count_images(&paths.raw_images_dir())?,
        raw_labels: count_label_files(&paths.raw_labels_dir())?,
        aug_images: count_images(&paths.aug_images_dir())?,
        train_images: count_images(&paths.split_images_dir(SplitPart::Train))?,
        val_images: count_images(&paths.split_images_dir(SplitPart::Val))?,
        train_config: paths.train_config_path().is_file(),
        run_status: None,
        metric: None,
        weights: None,
    };

    let report_path = paths.report_path();
    if report_path.is_file() {
        let bytes =
            fs::read(&report_path).with_context(|| format!("read {}", report_path.display()))?;
        let report: RunReport = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse {}", report_path.display()))?;
        status.run_status = Some(report.status);
        status.weights = report.weights().map(Path::to_path_buf);
        status.metric = report.training.map(|training| training.verdict.metric());
    }
    Ok(status)
}

fn count_label_files(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("txt") {
            count += 1;
        }
    }
    Ok(count)
}

pub fn render_text(status: &FolderStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "folder: {}", status.folder.display());
    let _ = writeln!(out, "classes:");
    for (id, label) in status.candidate_labels.iter().enumerate() {
        let _ = writeln!(out, "  {id}: {label}");
    }
    match status.camera_index {
        Some(index) => {
            let _ = writeln!(out, "camera: {index}");
        }
        None => {
            let _ = writeln!(out, "camera: (not selected)");
        }
    }
    let _ = writeln!(
        out,
        "raw: {} images, {} labels",
        status.raw_images, status.raw_labels
    );
    let _ = writeln!(out, "augmented: {} images", status.aug_images);
    let _ = writeln!(
        out,
        "split: {} train / {} val",
        status.train_images, status.val_images
    );
    if let Some(run_status) = &status.run_status {
        let _ = writeln!(out, "last run: {}", run_status.as_str());
    }
    if let Some(metric) = status.metric {
        let _ = writeln!(out, "metric: {metric:.3}");
    }
    if let Some(weights) = &status.weights {
        let _ = writeln!(out, "weights: {}", weights.display());
    }
    out
}
