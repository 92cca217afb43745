//! Camera that replays still images from `<root>/<index>/`, in name order.
use super::{CameraBackend, FrameRead, FrameSource};
use crate::dataset::list_images;
use crate::error::PipelineError;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ReplayCamera {
    root: PathBuf,
}

impl ReplayCamera {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn frames(&self, index: u32) -> Vec<PathBuf> {
        list_images(&self.root.join(index.to_string())).unwrap_or_default()
    }
}

impl CameraBackend for ReplayCamera {
    fn probe(&mut self, index: u32) -> bool {
        !self.frames(index).is_empty()
    }

    fn open(&mut self, index: u32) -> Result<Box<dyn FrameSource>> {
        let frames = self.frames(index);
        if frames.is_empty() {
            return Err(PipelineError::CameraOpen {
                index,
                reason: format!("no frames under {}", self.root.join(index.to_string()).display()),
            }
            .into());
        }
        Ok(Box::new(ReplaySource { frames, next: 0 }))
    }
}

struct ReplaySource {
    frames: Vec<PathBuf>,
    next: usize,
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<FrameRead> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(FrameRead::Ended);
        };
        self.next += 1;
        match image::open(path) {
            Ok(img) => Ok(FrameRead::Frame(img.to_rgb8())),
            Err(err) => {
                tracing::warn!(frame = %path.display(), "unreadable replay frame: {err}");
                Ok(FrameRead::Unreadable)
            }
        }
    }
}
