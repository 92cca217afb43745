//! Working-folder layout and dataset file formats.
//!
//! Every stage reads and writes the working folder through these helpers so
//! the on-disk layout stays in one place.
mod class_list;
mod files;
mod label;
mod paths;

pub use class_list::{discover_class_list, load_class_list};
pub use files::{copy_files, count_images, list_images, stem_of, write_atomic, write_json};
pub use label::{read_label_file, write_label_file, PixelBox, YoloBox};
pub use paths::{SplitPart, WorkingPaths};

use serde::{Deserialize, Serialize};
use std::fmt;

/// File name of the manifest inside a working folder.
pub const MANIFEST_FILE: &str = "inputs.json";
/// File name of the training-config document inside a working folder.
pub const TRAIN_CONFIG_FILE: &str = "train.yaml";
/// File name of the config snapshot written at run start.
pub const RUN_CONFIG_FILE: &str = "run_config.json";
/// File name of the outcome report written when a folder is retained.
pub const RUN_REPORT_FILE: &str = "run_report.json";

/// How a run relates to the lineage of earlier runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Ingest prior annotated data, then add one class.
    Bootstrap,
    /// Extend a prior run's taxonomy with one class.
    Incremental,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Bootstrap => "bootstrap",
            RunMode::Incremental => "incremental",
        }
    }

    /// Folder name for a run of this mode started at `timestamp`.
    pub fn folder_name(&self, timestamp: &str) -> String {
        format!("{}_v{timestamp}", self.as_str())
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
