mod common;

use common::{autotrain, stderr, stdout, Sandbox};

#[test]
fn incremental_run_trains_and_reports_status() {
    let Some(sandbox) = Sandbox::new(0.9) else {
        return;
    };
    let cameras = sandbox.camera_dir(3);

    let output = autotrain(sandbox.run_args(&cameras));

    assert!(
        output.status.success(),
        "run failed\nstdout:\n{}\nstderr:\n{}",
        stdout(&output),
        stderr(&output)
    );
    let text = stdout(&output);
    assert!(text.contains("Camera accessed: 0"), "stdout: {text}");
    assert!(text.contains("Accepted weights:"), "stdout: {text}");

    let folders = sandbox.run_folders();
    assert_eq!(folders.len(), 1);
    let folder = &folders[0];
    assert!(folder.join("train/weights/best.pt").is_file());

    let status = autotrain([
        "status".to_string(),
        "--folder".to_string(),
        folder.display().to_string(),
        "--json".to_string(),
    ]);
    assert!(status.status.success(), "stderr: {}", stderr(&status));
    let summary: serde_json::Value =
        serde_json::from_str(&stdout(&status)).expect("status json");
    assert_eq!(summary["candidate_labels"], serde_json::json!(["mug"]));
    assert_eq!(summary["camera_index"], 0);
    assert_eq!(summary["raw_images"], 2);
    assert_eq!(summary["raw_labels"], 2);
    assert_eq!(summary["aug_images"], 4);
    assert_eq!(summary["run_status"], "completed");
    assert_eq!(summary["metric"], 0.9);
}

#[test]
fn rejected_metric_keeps_folder_without_weights() {
    let Some(sandbox) = Sandbox::new(0.2) else {
        return;
    };
    let cameras = sandbox.camera_dir(2);

    let output = autotrain(sandbox.run_args(&cameras));

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Try with more images and training more epochs"));
    assert!(text.contains("No weights accepted."));
    assert_eq!(sandbox.run_folders().len(), 1);
}

#[test]
fn missing_camera_removes_the_working_folder() {
    let Some(sandbox) = Sandbox::new(0.9) else {
        return;
    };
    let cameras = sandbox.camera_dir(0);

    let output = autotrain(sandbox.run_args(&cameras));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("no camera"), "stderr: {}", stderr(&output));
    assert!(sandbox.run_folders().is_empty());
}

#[test]
fn bootstrap_without_prior_data_is_rejected_up_front() {
    let Some(sandbox) = Sandbox::new(0.9) else {
        return;
    };
    let cameras = sandbox.camera_dir(1);
    let mut args = sandbox.run_args(&cameras);
    args[2] = "bootstrap".to_string();

    let output = autotrain(&args);

    assert!(!output.status.success());
    assert!(!sandbox.data_root().exists());
}

#[test]
fn cameras_lists_replay_devices_as_json() {
    let Some(sandbox) = Sandbox::new(0.9) else {
        return;
    };
    let cameras = sandbox.camera_dir(1);

    let output = autotrain([
        "cameras".to_string(),
        "--camera-dir".to_string(),
        cameras.display().to_string(),
        "--json".to_string(),
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let listed: Vec<u32> = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(listed, vec![0]);
}
