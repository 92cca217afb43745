use super::*;
use crate::camera::CameraSession;
use crate::dataset::{list_images, read_label_file, stem_of};
use crate::test_support::{
    FakeCamera, FakeDetector, FakeFrame, ScriptedOperator, FRAME_HEIGHT, FRAME_WIDTH,
};

fn config(image_threshold: usize) -> LabelerConfig {
    LabelerConfig {
        image_threshold,
        thresholds: DetectorThresholds::default(),
        draw_overlay: true,
    }
}

fn working(dir: &std::path::Path) -> WorkingPaths {
    WorkingPaths::new(dir.join("run"))
}

#[test]
fn stops_exactly_at_threshold_with_unique_pairs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]);
    let mut detector = FakeDetector::always();
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    let summary = AutoLabeler::new(&paths, &mut detector, config(10), "red mug.", 2)
        .run(session, &mut operator)
        .expect("capture");

    assert_eq!(summary.accepted, 10);
    assert_eq!(summary.stop, StopReason::ThresholdReached);
    assert_eq!(detector.calls, 10);

    let images = list_images(&paths.raw_images_dir()).expect("list");
    assert_eq!(images.len(), 10);
    for image in &images {
        let stem = stem_of(image);
        assert!(stem.starts_with("image_"));
        let label = paths.raw_labels_dir().join(format!("{stem}.txt"));
        let boxes = read_label_file(&label).expect("label");
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 2);
    }
    assert_eq!(camera.released(), 1);
    assert_eq!(operator.watch_ends(), 1);
}

#[test]
fn label_geometry_is_normalized_to_frame_size() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]);
    let mut detector = FakeDetector::always();
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    AutoLabeler::new(&paths, &mut detector, config(1), "mug.", 0)
        .run(session, &mut operator)
        .expect("capture");

    let images = list_images(&paths.raw_images_dir()).expect("list");
    let label = paths
        .raw_labels_dir()
        .join(format!("{}.txt", stem_of(&images[0])));
    let boxes = read_label_file(&label).expect("label");
    // Fake box is (16,12)-(48,36) on a 64x48 frame.
    let b = boxes[0];
    assert!((b.xc - 0.5).abs() < 1e-4);
    assert!((b.yc - 0.5).abs() < 1e-4);
    assert!((b.w - 32.0 / FRAME_WIDTH as f32).abs() < 1e-4);
    assert!((b.h - 24.0 / FRAME_HEIGHT as f32).abs() < 1e-4);
}

#[test]
fn frames_without_detection_are_discarded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]);
    let mut detector = FakeDetector::with_pattern(&[false, true, false]);
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    let summary = AutoLabeler::new(&paths, &mut detector, config(3), "mug.", 0)
        .run(session, &mut operator)
        .expect("capture");

    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.skipped, 5);
    assert_eq!(list_images(&paths.raw_images_dir()).expect("list").len(), 3);
}

#[test]
fn detections_below_box_threshold_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]).with_script(vec![
        FakeFrame::Frame(1),
        FakeFrame::Frame(2),
        FakeFrame::Frame(3),
    ]);
    let mut detector = FakeDetector::always().scoring(0.59);
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    let summary = AutoLabeler::new(&paths, &mut detector, config(3), "mug.", 0)
        .run(session, &mut operator)
        .expect("capture");

    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.stop, StopReason::CameraEnded);
    assert!(list_images(&paths.raw_images_dir()).expect("list").is_empty());
}

#[test]
fn unreadable_frames_are_skipped_and_stream_end_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]).with_script(vec![
        FakeFrame::Frame(1),
        FakeFrame::Unreadable,
        FakeFrame::Frame(2),
    ]);
    let mut detector = FakeDetector::always();
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    let summary = AutoLabeler::new(&paths, &mut detector, config(10), "mug.", 0)
        .run(session, &mut operator)
        .expect("capture");

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.unreadable, 1);
    assert_eq!(summary.stop, StopReason::CameraEnded);
    assert_eq!(camera.released(), 1);
}

#[test]
fn operator_stop_ends_the_loop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]);
    let mut detector = FakeDetector::always();
    let mut operator = ScriptedOperator::new(&[]).stopping_after(4);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    let summary = AutoLabeler::new(&paths, &mut detector, config(100), "mug.", 0)
        .run(session, &mut operator)
        .expect("capture");

    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.stop, StopReason::OperatorStop);
    assert_eq!(operator.watch_ends(), 1);
}

#[test]
fn camera_and_watch_are_released_when_the_detector_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0]);
    let mut detector = FakeDetector::always().failing_on_call(3);
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    let err = AutoLabeler::new(&paths, &mut detector, config(10), "mug.", 0)
        .run(session, &mut operator)
        .expect_err("detector failure propagates");

    assert!(format!("{err:#}").contains("fake detector crashed"));
    assert_eq!(camera.released(), 1);
    assert_eq!(operator.watch_ends(), 1);
    assert_eq!(list_images(&paths.raw_images_dir()).expect("list").len(), 2);
}

#[test]
fn camera_failure_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = working(dir.path());
    let mut camera = FakeCamera::with_devices(&[0])
        .with_script(vec![FakeFrame::Frame(1), FakeFrame::Fail]);
    let mut detector = FakeDetector::always();
    let mut operator = ScriptedOperator::new(&[]);

    let session = CameraSession::open(&mut camera, 0).expect("open");
    AutoLabeler::new(&paths, &mut detector, config(10), "mug.", 0)
        .run(session, &mut operator)
        .expect_err("camera failure propagates");
    assert_eq!(camera.released(), 1);
}
