//! Typed paths into a working-folder layout.
use super::{MANIFEST_FILE, RUN_CONFIG_FILE, RUN_REPORT_FILE, TRAIN_CONFIG_FILE};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Partition of the split dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPart {
    Train,
    Val,
}

impl SplitPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitPart::Train => "train",
            SplitPart::Val => "val",
        }
    }
}

/// Convenience wrapper for locating working-folder artifacts.
#[derive(Debug, Clone)]
pub struct WorkingPaths {
    root: PathBuf,
}

impl WorkingPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `inputs.json` manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Return the `train.yaml` training-config path.
    pub fn train_config_path(&self) -> PathBuf {
        self.root.join(TRAIN_CONFIG_FILE)
    }

    pub fn run_config_path(&self) -> PathBuf {
        self.root.join(RUN_CONFIG_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(RUN_REPORT_FILE)
    }

    /// Return the `raw_dataset/` directory path.
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw_dataset")
    }

    pub fn raw_images_dir(&self) -> PathBuf {
        self.raw_dir().join("images")
    }

    pub fn raw_labels_dir(&self) -> PathBuf {
        self.raw_dir().join("labels")
    }

    /// Return the `aug_dataset/` directory path.
    pub fn aug_dir(&self) -> PathBuf {
        self.root.join("aug_dataset")
    }

    pub fn aug_images_dir(&self) -> PathBuf {
        self.aug_dir().join("images")
    }

    pub fn aug_labels_dir(&self) -> PathBuf {
        self.aug_dir().join("labels")
    }

    /// Return the `split_dataset/` directory path.
    pub fn split_dir(&self) -> PathBuf {
        self.root.join("split_dataset")
    }

    /// Return `split_dataset/<part>/`.
    pub fn split_part_dir(&self, part: SplitPart) -> PathBuf {
        self.split_dir().join(part.as_str())
    }

    pub fn split_images_dir(&self, part: SplitPart) -> PathBuf {
        self.split_part_dir(part).join("images")
    }

    pub fn split_labels_dir(&self, part: SplitPart) -> PathBuf {
        self.split_part_dir(part).join("labels")
    }

    /// Return the `pred_results/` directory for inference snapshots.
    pub fn pred_results_dir(&self) -> PathBuf {
        self.root.join("pred_results")
    }

    /// Create the `raw_dataset/{images,labels}` skeleton.
    pub fn ensure_raw_layout(&self) -> Result<()> {
        for dir in [self.raw_images_dir(), self.raw_labels_dir()] {
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Convert a path into a working-folder relative string.
    pub fn rel_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}
