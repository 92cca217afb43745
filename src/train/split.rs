//! File-level train/val split of `aug_dataset` into `split_dataset`.
use crate::dataset::{list_images, stem_of, SplitPart, WorkingPaths};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SPLIT_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train: usize,
    pub val: usize,
}

/// Number of samples going to `train` for `total` samples.
///
/// Keeps at least one sample on each side once there are two or more.
pub fn train_count(total: usize, ratio: f64) -> usize {
    if total == 0 {
        return 0;
    }
    let wanted = (total as f64 * ratio).round() as usize;
    let upper = if total >= 2 { total - 1 } else { total };
    wanted.clamp(1, upper)
}

/// Rebuild `split_dataset` from `aug_dataset`. An image always lands in the
/// same partition as its label.
pub fn split_dataset(paths: &WorkingPaths, ratio: f64, seed: Option<u64>) -> Result<SplitSummary> {
    let mut samples = list_images(&paths.aug_images_dir())?;
    let split_dir = paths.split_dir();
    if split_dir.exists() {
        fs::remove_dir_all(&split_dir)
            .with_context(|| format!("clear {}", split_dir.display()))?;
    }
    for part in [SplitPart::Train, SplitPart::Val] {
        for dir in [paths.split_images_dir(part), paths.split_labels_dir(part)] {
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    samples.shuffle(&mut rng);
    let cut = train_count(samples.len(), ratio);
    let (train, val) = samples.split_at(cut);

    copy_samples(paths, train, SplitPart::Train)?;
    copy_samples(paths, val, SplitPart::Val)?;
    let summary = SplitSummary {
        train: train.len(),
        val: val.len(),
    };
    tracing::info!(train = summary.train, val = summary.val, "split dataset");
    Ok(summary)
}

fn copy_samples(paths: &WorkingPaths, images: &[PathBuf], part: SplitPart) -> Result<()> {
    let labels_src = paths.aug_labels_dir();
    let images_dest = paths.split_images_dir(part);
    let labels_dest = paths.split_labels_dir(part);
    for image in images {
        copy_into(image, &images_dest)?;
        let label = labels_src.join(format!("{}.txt", stem_of(image)));
        if label.is_file() {
            copy_into(&label, &labels_dest)?;
        }
    }
    Ok(())
}

fn copy_into(file: &Path, dest_dir: &Path) -> Result<()> {
    let Some(name) = file.file_name() else {
        return Ok(());
    };
    let target = dest_dir.join(name);
    fs::copy(file, &target)
        .with_context(|| format!("copy {} -> {}", file.display(), target.display()))?;
    Ok(())
}
