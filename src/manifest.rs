//! Manifest store: the single persisted document holding the ordered label
//! taxonomy and the selected camera of one working folder.
//!
//! Every mutation is a complete load-modify-save through [`ManifestStore::update`];
//! callers never hold a manifest across stages. The store assumes one writer
//! per working folder at a time.
use crate::dataset::write_json;
use crate::error::PipelineError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::PathBuf;

/// Typed view of `inputs.json`.
///
/// The position of a label is the class id written into label files, so
/// entries are only ever appended, or the last one replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub candidate_labels: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_camera_index"
    )]
    pub camera_index: Option<u32>,
}

// Older manifests stored the camera index as a string when it came from a prompt.
fn deserialize_camera_index<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIndex {
        Number(u32),
        Text(String),
    }

    match Option::<RawIndex>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawIndex::Number(index)) => Ok(Some(index)),
        Some(RawIndex::Text(text)) => text
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create an empty manifest unless one already exists, then load it.
    pub fn ensure(&self) -> Result<Manifest> {
        if !self.path.is_file() {
            self.save(&Manifest::default())?;
            tracing::debug!(path = %self.path.display(), "created empty manifest");
        }
        self.load()
    }

    pub fn load(&self) -> Result<Manifest> {
        let bytes =
            fs::read(&self.path).with_context(|| format!("read manifest {}", self.path.display()))?;
        serde_json::from_slice(&bytes).map_err(|source| {
            PipelineError::ManifestCorrupt {
                path: self.path.clone(),
                source,
            }
            .into()
        })
    }

    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        write_json(&self.path, manifest)
    }

    /// Load, mutate, and save the whole document in one step.
    pub fn update<T>(&self, mutate: impl FnOnce(&mut Manifest) -> Result<T>) -> Result<T> {
        let mut manifest = self.load()?;
        let value = mutate(&mut manifest)?;
        self.save(&manifest)?;
        Ok(value)
    }

    /// Append a label and return its class id.
    pub fn append_label(&self, name: &str) -> Result<usize> {
        self.update(|manifest| {
            manifest.candidate_labels.push(name.to_string());
            Ok(manifest.candidate_labels.len() - 1)
        })
    }

    /// Overwrite the most recently appended label, keeping its class id.
    pub fn replace_last_label(&self, name: &str) -> Result<()> {
        self.update(|manifest| {
            let last = manifest
                .candidate_labels
                .last_mut()
                .ok_or_else(|| anyhow!("manifest has no label to replace"))?;
            *last = name.to_string();
            Ok(())
        })
    }

    /// Overwrite the whole label sequence and return the previous one.
    pub fn replace_labels(&self, labels: Vec<String>) -> Result<Vec<String>> {
        self.update(|manifest| Ok(std::mem::replace(&mut manifest.candidate_labels, labels)))
    }

    pub fn set_camera(&self, index: u32) -> Result<()> {
        self.update(|manifest| {
            manifest.camera_index = Some(index);
            Ok(())
        })
    }
}
