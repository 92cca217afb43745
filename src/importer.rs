//! Prior-data import: merge an annotated dataset into `raw_dataset` and reset
//! the manifest taxonomy from the dataset's class list.
//!
//! Label files are copied verbatim, never renumbered, so every source label is
//! checked against the incoming class list before anything is copied.
use crate::dataset::{
    discover_class_list, list_images, load_class_list, read_label_file, stem_of, WorkingPaths,
};
use crate::draw::{draw_box, OVERLAY_COLOR, OVERLAY_THICKNESS};
use crate::error::PipelineError;
use crate::manifest::ManifestStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the prior data comes from and how its class list is found.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub source: PathBuf,
    /// Foreign exports carry their class list next to the splits; curated
    /// sources need `class_list`.
    pub foreign: bool,
    pub class_list: Option<PathBuf>,
    /// Redraw imported boxes onto foreign images.
    pub draw_overlay: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub class_list: PathBuf,
    pub classes: Vec<String>,
    /// Image/label pairs copied into `raw_dataset`.
    pub images: usize,
    /// Source images skipped because no label shares their stem.
    #[serde(default)]
    pub unlabeled: usize,
    /// Labels the manifest held before the overwrite.
    pub discarded: Vec<String>,
}

pub fn import_prior_data(
    paths: &WorkingPaths,
    store: &ManifestStore,
    request: &ImportRequest,
) -> Result<ImportSummary> {
    let source = request.source.as_path();
    if !source.is_dir() {
        return Err(PipelineError::Configuration(format!(
            "prior data folder {} does not exist",
            source.display()
        ))
        .into());
    }
    let class_list = resolve_class_list(request)?;
    let classes = load_class_list(&class_list)?;
    tracing::info!(
        class_list = %class_list.display(),
        classes = classes.len(),
        "loaded class list"
    );

    let splits = source_splits(source)?;
    if splits.is_empty() {
        tracing::warn!(source = %source.display(), "no images/labels folders found in prior data");
    }
    let mut samples = Vec::new();
    let mut unlabeled = 0;
    for split in &splits {
        let (paired, skipped) = labeled_samples(split)?;
        samples.extend(paired);
        unlabeled += skipped;
    }
    for sample in &samples {
        validate_label(&sample.label, classes.len())?;
    }

    paths.ensure_raw_layout()?;
    for sample in &samples {
        sample.copy_into(paths)?;
    }
    let images = samples.len();
    if request.foreign && request.draw_overlay {
        draw_imported_boxes(paths)?;
    }

    let discarded = store.replace_labels(classes.clone())?;
    if !discarded.is_empty() && discarded != classes {
        tracing::warn!(?discarded, "prior data replaced the existing label taxonomy");
    }
    tracing::info!(images, unlabeled, "imported prior data");
    Ok(ImportSummary {
        class_list,
        classes,
        images,
        unlabeled,
        discarded,
    })
}

fn resolve_class_list(request: &ImportRequest) -> Result<PathBuf> {
    match (&request.class_list, request.foreign) {
        (Some(path), _) => {
            if !path.is_file() {
                return Err(PipelineError::Configuration(format!(
                    "class list {} does not exist",
                    path.display()
                ))
                .into());
            }
            Ok(path.clone())
        }
        (None, true) => discover_class_list(&request.source),
        (None, false) => Err(PipelineError::Configuration(
            "a class list is required when importing curated data".to_string(),
        )
        .into()),
    }
}

/// Split folders holding `images/` (and usually `labels/`).
///
/// A source that holds them directly is a single split; otherwise every
/// immediate subfolder with an `images/` folder is one.
fn source_splits(source: &Path) -> Result<Vec<PathBuf>> {
    if source.join("images").is_dir() {
        return Ok(vec![source.to_path_buf()]);
    }
    let mut splits = Vec::new();
    for entry in fs::read_dir(source).with_context(|| format!("read {}", source.display()))? {
        let path = entry?.path();
        if path.join("images").is_dir() {
            splits.push(path);
        }
    }
    splits.sort();
    Ok(splits)
}

/// An image and the label file sharing its stem.
#[derive(Debug)]
struct LabeledSample {
    image: PathBuf,
    label: PathBuf,
}

impl LabeledSample {
    fn copy_into(&self, paths: &WorkingPaths) -> Result<()> {
        copy_named(&self.image, &paths.raw_images_dir())?;
        copy_named(&self.label, &paths.raw_labels_dir())
    }
}

fn copy_named(src: &Path, dest_dir: &Path) -> Result<()> {
    let Some(name) = src.file_name() else {
        return Ok(());
    };
    let target = dest_dir.join(name);
    fs::copy(src, &target)
        .with_context(|| format!("copy {} -> {}", src.display(), target.display()))?;
    Ok(())
}

/// Pair each image of a split with `labels/<stem>.txt`. Returns the pairs
/// and the number of images left without a label.
fn labeled_samples(split: &Path) -> Result<(Vec<LabeledSample>, usize)> {
    let labels_dir = split.join("labels");
    let mut samples = Vec::new();
    let mut unlabeled = 0;
    for image in list_images(&split.join("images"))? {
        let label = labels_dir.join(format!("{}.txt", stem_of(&image)));
        if label.is_file() {
            samples.push(LabeledSample { image, label });
        } else {
            tracing::warn!(image = %image.display(), "skipping prior image without a label");
            unlabeled += 1;
        }
    }
    Ok((samples, unlabeled))
}

fn validate_label(label_file: &Path, class_count: usize) -> Result<()> {
    for bbox in read_label_file(label_file)? {
        if bbox.class_id >= class_count {
            return Err(PipelineError::ClassIdOutOfRange {
                label_file: label_file.to_path_buf(),
                class_id: bbox.class_id,
                class_count,
            }
            .into());
        }
    }
    Ok(())
}

fn draw_imported_boxes(paths: &WorkingPaths) -> Result<()> {
    let labels_dir = paths.raw_labels_dir();
    for image_path in list_images(&paths.raw_images_dir())? {
        let label_path = labels_dir.join(format!("{}.txt", stem_of(&image_path)));
        if !label_path.is_file() {
            continue;
        }
        let boxes = read_label_file(&label_path)?;
        let mut frame = match image::open(&image_path) {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                tracing::warn!(image = %image_path.display(), "skipping overlay: {err}");
                continue;
            }
        };
        let (width, height) = frame.dimensions();
        for bbox in &boxes {
            draw_box(
                &mut frame,
                &bbox.to_pixel(width, height),
                OVERLAY_COLOR,
                OVERLAY_THICKNESS,
            );
        }
        frame
            .save(&image_path)
            .with_context(|| format!("write {}", image_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "importer_tests.rs"]
mod tests;
