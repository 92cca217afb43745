//! Augmentation: carry raw samples into `aug_dataset` and add `number_aug`
//! transformed variants of each.
mod transform;

pub use transform::Transform;

use crate::dataset::{list_images, read_label_file, stem_of, write_label_file, WorkingPaths};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Copy)]
pub struct AugmentConfig {
    pub number_aug: usize,
    /// Fixed seed for reproducible variants.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentSummary {
    pub originals: usize,
    pub variants: usize,
    /// Raw images skipped because they had no label file.
    pub unlabeled: usize,
    /// Boxes that left the frame in some variant.
    pub dropped_boxes: usize,
}

pub fn augment_dataset(paths: &WorkingPaths, config: &AugmentConfig) -> Result<AugmentSummary> {
    let images = list_images(&paths.raw_images_dir())?;
    let mut summary = AugmentSummary::default();
    if images.is_empty() {
        tracing::info!("no raw images; skipping augmentation");
        return Ok(summary);
    }
    let out_images = paths.aug_images_dir();
    let out_labels = paths.aug_labels_dir();
    for dir in [&out_images, &out_labels] {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for image_path in images {
        let stem = stem_of(&image_path);
        let label_path = paths.raw_labels_dir().join(format!("{stem}.txt"));
        if !label_path.is_file() {
            tracing::warn!(image = %image_path.display(), "no label file; not augmenting");
            summary.unlabeled += 1;
            continue;
        }
        let labels = read_label_file(&label_path)?;
        let Some(file_name) = image_path.file_name() else {
            continue;
        };
        fs::copy(&image_path, out_images.join(file_name))
            .with_context(|| format!("copy {}", image_path.display()))?;
        fs::copy(&label_path, out_labels.join(format!("{stem}.txt")))
            .with_context(|| format!("copy {}", label_path.display()))?;
        summary.originals += 1;

        let image = image::open(&image_path)
            .with_context(|| format!("decode {}", image_path.display()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        let ext = image_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");
        for n in 1..=config.number_aug {
            let transform = Transform::sample(&mut rng);
            let moved = transform.apply_labels(&labels, width, height);
            summary.dropped_boxes += labels.len() - moved.len();
            let variant = format!("{stem}_{n}");
            let variant_image = out_images.join(format!("{variant}.{ext}"));
            transform
                .apply_image(&image)
                .save(&variant_image)
                .with_context(|| format!("write {}", variant_image.display()))?;
            write_label_file(&out_labels.join(format!("{variant}.txt")), &moved)?;
            summary.variants += 1;
        }
        tracing::debug!(image = %stem, variants = config.number_aug, "augmented");
    }
    tracing::info!(
        originals = summary.originals,
        variants = summary.variants,
        dropped_boxes = summary.dropped_boxes,
        "augmentation complete"
    );
    Ok(summary)
}
