//! Typed failure taxonomy for the pipeline.
//!
//! Stages return `anyhow::Result` like the rest of the workflow; these variants
//! travel inside it so the orchestrator and tests can tell failures apart with
//! `downcast_ref::<PipelineError>()`.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input for the selected mode is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The manifest exists but is not a valid manifest document.
    #[error("manifest {path} is corrupt: {source}")]
    ManifestCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no camera found (probed indices 0..{probed})")]
    NoCameraFound { probed: u32 },

    #[error("no class list (*.yaml/*.yml) found next to {dir}")]
    NoClassListFound { dir: PathBuf },

    /// An imported label references a class the taxonomy does not have.
    #[error("{label_file}: class id {class_id} is out of range for {class_count} classes")]
    ClassIdOutOfRange {
        label_file: PathBuf,
        class_id: usize,
        class_count: usize,
    },

    #[error("{label_file}:{line}: malformed label line: {reason}")]
    MalformedLabel {
        label_file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to open camera {index}: {reason}")]
    CameraOpen { index: u32, reason: String },

    #[error("run interrupted by operator")]
    Interrupted,
}
