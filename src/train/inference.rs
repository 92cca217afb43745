//! Live inference with an accepted artifact; frames with predictions are saved
//! as `pred_results/result{i}.jpg`.
use crate::camera::{CameraSession, FrameRead};
use crate::dataset::WorkingPaths;
use crate::draw::{draw_box, OVERLAY_COLOR, OVERLAY_THICKNESS};
use crate::external::Predictor;
use crate::operator::{Operator, StopWatch};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceSummary {
    pub frames: usize,
    pub snapshots: Vec<PathBuf>,
}

/// Run until the operator stops or the stream ends. The session is released
/// on return.
pub fn run_inference(
    paths: &WorkingPaths,
    mut session: CameraSession,
    predictor: &mut dyn Predictor,
    operator: &mut dyn Operator,
    conf: f32,
) -> Result<InferenceSummary> {
    let out_dir = paths.pred_results_dir();
    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    operator.say("Running live inference (press q or Esc to stop)");
    let mut watch = StopWatch::start(operator)?;
    let mut summary = InferenceSummary::default();

    while !watch.stop_requested()? {
        let mut frame = match session.next_frame()? {
            FrameRead::Frame(frame) => frame,
            FrameRead::Unreadable => continue,
            FrameRead::Ended => break,
        };
        summary.frames += 1;
        let predictions = predictor.predict(&frame, conf).context("run predictor")?;
        if predictions.is_empty() {
            tracing::debug!(frame = summary.frames, "no detection");
            continue;
        }
        for prediction in &predictions {
            draw_box(&mut frame, &prediction.bbox, OVERLAY_COLOR, OVERLAY_THICKNESS);
        }
        let snapshot = out_dir.join(format!("result{}.jpg", summary.snapshots.len()));
        frame
            .save(&snapshot)
            .with_context(|| format!("write {}", snapshot.display()))?;
        watch.say("Detected!");
        tracing::info!(
            predictions = predictions.len(),
            snapshot = %paths.rel_path(&snapshot),
            "inference hit"
        );
        summary.snapshots.push(snapshot);
    }
    tracing::info!(
        frames = summary.frames,
        hits = summary.snapshots.len(),
        camera = session.index(),
        "inference finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::PredictorFactory;
    use crate::test_support::{FakeCamera, FakePredictorFactory, ScriptedOperator};
    use std::path::Path;

    #[test]
    fn saves_numbered_snapshots_for_hits_until_stop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = WorkingPaths::new(dir.path().to_path_buf());
        let mut camera = FakeCamera::with_devices(&[0]);
        let mut factory = FakePredictorFactory::hitting_every(2);
        let mut predictor = factory.open(Path::new("best.pt")).expect("open");
        let mut operator = ScriptedOperator::new(&[]).stopping_after(7);

        let session = CameraSession::open(&mut camera, 0).expect("open camera");
        let summary = run_inference(&paths, session, predictor.as_mut(), &mut operator, 0.3)
            .expect("inference");

        assert_eq!(summary.frames, 6);
        assert_eq!(summary.snapshots.len(), 3);
        assert!(paths.pred_results_dir().join("result0.jpg").is_file());
        assert!(paths.pred_results_dir().join("result2.jpg").is_file());
        assert_eq!(camera.released(), 1);
        assert_eq!(operator.watch_ends(), 1);
    }
}
