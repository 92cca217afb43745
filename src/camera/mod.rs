//! Camera devices: enumeration, selection, and scoped capture sessions.
//!
//! A device is held only while a [`CameraSession`] is alive; dropping the
//! session releases it on every exit path of a capture or inference loop.
mod command;
mod ppm;
mod replay;
mod select;

pub use command::{CommandCamera, DEFAULT_CAMERA_COMMAND};
pub use replay::ReplayCamera;
pub use select::{enumerate_cameras, select_camera};

use anyhow::Result;
use image::RgbImage;

/// Outcome of one read from an open device.
#[derive(Debug)]
pub enum FrameRead {
    Frame(RgbImage),
    /// The device produced something that could not be decoded.
    Unreadable,
    /// The device stopped producing frames.
    Ended,
}

/// An opened device.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<FrameRead>;
}

/// Access to camera devices by index.
pub trait CameraBackend {
    /// Whether `index` opens and yields a frame. Must not keep the device.
    fn probe(&mut self, index: u32) -> bool;

    fn open(&mut self, index: u32) -> Result<Box<dyn FrameSource>>;
}

/// Exclusive hold on one device for the duration of a loop.
pub struct CameraSession {
    index: u32,
    source: Box<dyn FrameSource>,
}

impl CameraSession {
    pub fn open(backend: &mut dyn CameraBackend, index: u32) -> Result<Self> {
        let source = backend.open(index)?;
        tracing::debug!(camera = index, "camera opened");
        Ok(Self { index, source })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn next_frame(&mut self) -> Result<FrameRead> {
        self.source.next_frame()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        tracing::debug!(camera = self.index, "camera released");
    }
}
