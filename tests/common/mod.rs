//! Shared test infrastructure for integration tests.
//!
//! Collaborators are stood in for by small `sh` scripts and a replay camera
//! directory, so the real binary runs end to end without devices or models.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Detector worker answering every request with one box.
const DETECTOR_SCRIPT: &str = r#"while IFS= read -r line; do
  printf '%s\n' '{"detections": [{"box": [2, 2, 20, 20], "label": "mug", "score": 0.9}]}'
done
"#;

/// Trainer that writes a weights file under `--project` and reports `AP`.
const TRAINER_SCRIPT: &str = r#"project=.
while [ $# -gt 0 ]; do
  case "$1" in
    --project) project="$2"; shift ;;
  esac
  shift
done
mkdir -p "$project/train/weights"
: > "$project/train/weights/best.pt"
echo "training done"
printf '{"save_dir": "%s/train", "all_ap": [AP]}\n' "$project"
"#;

pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    /// Returns `None` when no `sh` is available to run the stand-in scripts.
    pub fn new(metric: f64) -> Option<Self> {
        if which::which("sh").is_err() {
            eprintln!("skipping: sh not found");
            return None;
        }
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("detector.sh"), DETECTOR_SCRIPT).expect("detector script");
        fs::write(
            dir.path().join("trainer.sh"),
            TRAINER_SCRIPT.replace("AP", &metric.to_string()),
        )
        .expect("trainer script");
        Some(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_root(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Replay camera root with `frames` stills for device 0.
    pub fn camera_dir(&self, frames: usize) -> PathBuf {
        let root = self.path().join("cameras");
        let device = root.join("0");
        fs::create_dir_all(&device).expect("camera dir");
        for i in 0..frames {
            image::RgbImage::from_pixel(32, 32, image::Rgb([90, 40, 40]))
                .save(device.join(format!("frame{i:02}.png")))
                .expect("save frame");
        }
        root
    }

    /// Arguments for an incremental run wired to the stand-in collaborators.
    pub fn run_args(&self, camera_dir: &Path) -> Vec<String> {
        let script = |name: &str| format!("sh {}", self.path().join(name).display());
        vec![
            "run".into(),
            "--mode".into(),
            "incremental".into(),
            "--camera-dir".into(),
            camera_dir.display().to_string(),
            "--camera-range".into(),
            "2".into(),
            "--detector-command".into(),
            script("detector.sh"),
            "--trainer-command".into(),
            script("trainer.sh"),
            "--object".into(),
            "Red Mug".into(),
            "--class-name".into(),
            "mug".into(),
            "--image-threshold".into(),
            "2".into(),
            "--number-aug".into(),
            "1".into(),
            "--seed".into(),
            "3".into(),
            "--data-root".into(),
            self.data_root().display().to_string(),
        ]
    }

    /// Working folders under the data root, sorted by name.
    pub fn run_folders(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.data_root()) else {
            return Vec::new();
        };
        let mut folders: Vec<PathBuf> = entries
            .map(|entry| entry.expect("entry").path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();
        folders
    }
}

/// Run the `autotrain` binary with a closed stdin.
pub fn autotrain<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_autotrain"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("run autotrain")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
