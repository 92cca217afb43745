//! One pipeline run, from working-folder creation to the acceptance gate.
//!
//! Stages return results; this module alone decides what happens to the
//! working folder when one fails. The decision looks only at what is on disk:
//! no raw images means the folder is removed, anything else is kept.
use super::config::RunConfig;
use super::report::{RunReport, RunStatus};
use crate::augment::{augment_dataset, AugmentConfig};
use crate::camera::{select_camera, CameraBackend, CameraSession};
use crate::dataset::{copy_files, count_images, write_json, RunMode, WorkingPaths, MANIFEST_FILE};
use crate::error::PipelineError;
use crate::external::{normalize_phrase, Detector, PredictorFactory, Trainer};
use crate::importer::{import_prior_data, ImportRequest};
use crate::labeler::{AutoLabeler, LabelerConfig};
use crate::manifest::{Manifest, ManifestStore};
use crate::operator::{check_interrupted, Operator};
use crate::train::{run_inference, train_and_gate, TrainSettings};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// The external collaborators a run drives.
pub struct Collaborators<'a> {
    pub camera: &'a mut dyn CameraBackend,
    pub detector: &'a mut dyn Detector,
    pub trainer: &'a mut dyn Trainer,
    pub predictors: &'a mut dyn PredictorFactory,
    pub operator: &'a mut dyn Operator,
}

impl Collaborators<'_> {
    fn reborrow(&mut self) -> Collaborators<'_> {
        Collaborators {
            camera: &mut *self.camera,
            detector: &mut *self.detector,
            trainer: &mut *self.trainer,
            predictors: &mut *self.predictors,
            operator: &mut *self.operator,
        }
    }
}

/// Run the whole pipeline for `config`.
///
/// On failure the error is returned after the working folder has been either
/// removed (no raw images) or kept with a `run_report.json`.
pub fn run_pipeline(config: &RunConfig, mut collaborators: Collaborators<'_>) -> Result<RunReport> {
    config.validate()?;
    let paths = create_working_folder(config)?;
    let store = ManifestStore::new(paths.manifest_path());
    let mut report = RunReport::new(config.mode, paths.root().to_path_buf());
    tracing::info!(mode = %config.mode, folder = %paths.root().display(), "run started");

    let result = execute(config, &paths, &store, collaborators.reborrow(), &mut report);

    let raw_images = match count_images(&paths.raw_images_dir()) {
        Ok(count) => Some(count),
        Err(err) => {
            tracing::warn!("failed to count raw images: {err:#}");
            None
        }
    };
    report.raw_images = raw_images.unwrap_or(0);
    if let Ok(manifest) = store.load() {
        report.classes = manifest.candidate_labels;
    }

    let err = match result {
        Ok(()) if raw_images != Some(0) => {
            report.status = RunStatus::Completed;
            write_json(&paths.report_path(), &report)?;
            tracing::info!(folder = %paths.root().display(), "run complete");
            return Ok(report);
        }
        Ok(()) => anyhow!("run produced no images"),
        Err(err) => err,
    };

    if raw_images == Some(0) {
        roll_back(&paths);
        return Err(err.context(format!(
            "run aborted; removed empty working folder {}",
            paths.root().display()
        )));
    }
    report.status = if collaborators.operator.interrupted() || is_interrupt(&err) {
        RunStatus::Interrupted
    } else {
        RunStatus::Failed
    };
    report.error = Some(format!("{err:#}"));
    if let Err(write_err) = write_json(&paths.report_path(), &report) {
        tracing::warn!("failed to write run report: {write_err:#}");
    }
    tracing::warn!(
        folder = %paths.root().display(),
        raw_images = report.raw_images,
        "run failed; keeping partial working folder"
    );
    Err(err.context(format!(
        "run failed; kept {} raw image(s) in {}",
        report.raw_images,
        paths.root().display()
    )))
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Interrupted)
    )
}

fn create_working_folder(config: &RunConfig) -> Result<WorkingPaths> {
    fs::create_dir_all(&config.data_root)
        .with_context(|| format!("create {}", config.data_root.display()))?;
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let root = config.data_root.join(config.mode.folder_name(&timestamp));
    fs::create_dir(&root).with_context(|| format!("create working folder {}", root.display()))?;
    let paths = WorkingPaths::new(root);
    paths.ensure_raw_layout()?;
    Ok(paths)
}

fn roll_back(paths: &WorkingPaths) {
    match fs::remove_dir_all(paths.root()) {
        Ok(()) => tracing::info!(folder = %paths.root().display(), "removed empty working folder"),
        Err(err) => tracing::warn!(
            folder = %paths.root().display(),
            "failed to remove working folder: {err}"
        ),
    }
}

fn execute(
    config: &RunConfig,
    paths: &WorkingPaths,
    store: &ManifestStore,
    collaborators: Collaborators<'_>,
    report: &mut RunReport,
) -> Result<()> {
    let Collaborators {
        camera,
        detector,
        trainer,
        predictors,
        operator,
    } = collaborators;

    store.ensure()?;
    write_json(&paths.run_config_path(), config)?;

    let prior = match (config.mode, &config.prior_run) {
        (RunMode::Incremental, Some(dir)) => Some(load_prior_manifest(dir)?),
        _ => None,
    };
    let preferred = config
        .camera
        .or_else(|| prior.as_ref().and_then(|m| m.camera_index));
    let camera_index = select_camera(camera, operator, store, config.camera_range, preferred)?;
    report.camera_index = Some(camera_index);
    check_interrupted(&*operator)?;

    match config.mode {
        RunMode::Bootstrap => {
            let source = config
                .prior_data
                .clone()
                .ok_or_else(|| PipelineError::Configuration("missing prior data".to_string()))?;
            let request = ImportRequest {
                source,
                foreign: config.foreign,
                class_list: config.class_list.clone(),
                draw_overlay: config.import_overlay,
            };
            report.import = Some(import_prior_data(paths, store, &request)?);
        }
        RunMode::Incremental => {
            if let (Some(dir), Some(prior)) = (&config.prior_run, prior) {
                report.carried_forward = Some(carry_forward(dir, prior, paths, store)?);
            }
        }
    }
    check_interrupted(&*operator)?;

    let phrase = ask_phrase(config, operator)?;
    let class_name = ask_class_name(config, operator, &phrase)?;
    report.phrase = Some(phrase.clone());
    report.class_name = Some(class_name.clone());

    let class_id = store.append_label(&phrase)?;
    tracing::info!(class_id, phrase = %phrase, "hunting new class");
    let session = CameraSession::open(camera, camera_index)?;
    let labeler_config = LabelerConfig {
        image_threshold: config.image_threshold,
        thresholds: config.thresholds,
        draw_overlay: true,
    };
    let labeler = AutoLabeler::new(paths, detector, labeler_config, &phrase, class_id);
    report.capture = Some(labeler.run(session, operator)?);
    check_interrupted(&*operator)?;
    store.replace_last_label(&class_name)?;

    if count_images(&paths.raw_images_dir())? == 0 {
        return Err(anyhow!("no images were captured for '{phrase}'"));
    }

    report.augment = Some(augment_dataset(
        paths,
        &AugmentConfig {
            number_aug: config.number_aug,
            seed: config.seed,
        },
    )?);
    check_interrupted(&*operator)?;

    let labels = store.load()?.candidate_labels;
    let settings = TrainSettings {
        epochs: config.epochs,
        device: config.device.clone(),
        map_threshold: config.map_threshold,
        split_ratio: config.split_ratio,
        seed: config.seed,
    };
    let outcome = train_and_gate(paths, &labels, trainer, &settings)?;
    let weights = outcome.verdict.weights().map(Path::to_path_buf);
    report.training = Some(outcome);
    match &weights {
        Some(weights) => operator.say(&format!(
            "Trained and stored new weights: {}",
            weights.display()
        )),
        None => operator.say("Try with more images and training more epochs"),
    }

    if config.inference {
        let Some(weights) = weights else {
            tracing::info!("no accepted artifact; live inference skipped");
            return Ok(());
        };
        check_interrupted(&*operator)?;
        let mut predictor = predictors.open(&weights)?;
        let session = CameraSession::open(camera, camera_index)?;
        report.inference = Some(run_inference(
            paths,
            session,
            predictor.as_mut(),
            operator,
            config.inference_threshold,
        )?);
    }
    Ok(())
}

fn load_prior_manifest(prior_run: &Path) -> Result<Manifest> {
    ManifestStore::new(prior_run.join(MANIFEST_FILE))
        .load()
        .with_context(|| format!("load prior run {}", prior_run.display()))
}

/// Seed the new folder with a prior run's taxonomy and raw samples.
fn carry_forward(
    prior_run: &Path,
    prior: Manifest,
    paths: &WorkingPaths,
    store: &ManifestStore,
) -> Result<usize> {
    let prior_paths = WorkingPaths::new(prior_run.to_path_buf());
    let classes = prior.candidate_labels.len();
    store.replace_labels(prior.candidate_labels)?;
    let images = copy_files(&prior_paths.raw_images_dir(), &paths.raw_images_dir())?;
    copy_files(&prior_paths.raw_labels_dir(), &paths.raw_labels_dir())?;
    tracing::info!(
        prior = %prior_run.display(),
        classes,
        images,
        "carried prior run forward"
    );
    Ok(images)
}

fn ask_phrase(config: &RunConfig, operator: &mut dyn Operator) -> Result<String> {
    let raw = match &config.object {
        Some(object) => object.clone(),
        None => operator.ask("Enter the object to detect:")?,
    };
    if raw.trim().trim_end_matches('.').trim().is_empty() {
        return Err(PipelineError::Configuration("object phrase is empty".to_string()).into());
    }
    Ok(normalize_phrase(&raw))
}

/// The short name stored in the manifest once capture is done. Defaults to
/// the phrase without its trailing period.
fn ask_class_name(
    config: &RunConfig,
    operator: &mut dyn Operator,
    phrase: &str,
) -> Result<String> {
    let raw = match &config.class_name {
        Some(name) => name.clone(),
        None => operator.ask(&format!("Enter a short class name for '{phrase}':"))?,
    };
    let name = raw.trim();
    if name.is_empty() {
        return Ok(phrase.trim_end_matches('.').to_string());
    }
    Ok(name.to_string())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
