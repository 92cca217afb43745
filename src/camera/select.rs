//! Camera enumeration and selection.
use super::CameraBackend;
use crate::error::PipelineError;
use crate::manifest::ManifestStore;
use crate::operator::{check_interrupted, Operator};
use anyhow::Result;

/// Probe indices `0..range` and return the ones that open.
pub fn enumerate_cameras(backend: &mut dyn CameraBackend, range: u32) -> Vec<u32> {
    let available: Vec<u32> = (0..range).filter(|index| backend.probe(*index)).collect();
    tracing::debug!(?available, range, "probed cameras");
    available
}

/// Pick a camera and persist it into the manifest.
///
/// One device is taken as is. With several, `preferred` (if any) and then the
/// operator's answers are checked against the enumerated set until one
/// matches. With none, nothing is persisted and `NoCameraFound` is returned.
pub fn select_camera(
    backend: &mut dyn CameraBackend,
    operator: &mut dyn Operator,
    store: &ManifestStore,
    range: u32,
    preferred: Option<u32>,
) -> Result<u32> {
    let cameras = enumerate_cameras(backend, range);
    let chosen = match cameras.as_slice() {
        [] => {
            operator.say("No cameras found.");
            return Err(PipelineError::NoCameraFound { probed: range }.into());
        }
        [only] => *only,
        _ => {
            operator.say(&format!("Available cameras: {cameras:?}"));
            let mut candidate = preferred;
            loop {
                if let Some(index) = candidate.filter(|index| cameras.contains(index)) {
                    break index;
                }
                if candidate.is_some() {
                    operator.say("Choose the camera from the indexes given above");
                }
                check_interrupted(&*operator)?;
                let answer = operator.ask("Enter camera index to use:")?;
                candidate = Some(answer.parse::<u32>().unwrap_or(u32::MAX));
            }
        }
    };
    store.set_camera(chosen)?;
    operator.say(&format!("Camera accessed: {chosen}"));
    tracing::info!(camera = chosen, "camera selected");
    Ok(chosen)
}
