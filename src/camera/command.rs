//! Camera backed by a streaming capture command that writes PPM frames to
//! stdout (ffmpeg by default).
use super::ppm::read_ppm_frame;
use super::{CameraBackend, FrameRead, FrameSource};
use crate::error::PipelineError;
use crate::external::split_command;
use anyhow::{anyhow, Context, Result};
use std::io::BufReader;
use std::process::{Child, ChildStdout, Command, Stdio};

/// Default capture command; `{index}` is replaced with the device index.
pub const DEFAULT_CAMERA_COMMAND: &str =
    "ffmpeg -loglevel error -f v4l2 -i /dev/video{index} -f image2pipe -vcodec ppm -";

#[derive(Debug, Clone)]
pub struct CommandCamera {
    template: String,
}

impl CommandCamera {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    fn command_for(&self, index: u32) -> Result<Vec<String>> {
        let line = self.template.replace("{index}", &index.to_string());
        split_command(&line)
    }

    fn spawn(&self, index: u32) -> Result<CommandFrameSource> {
        let args = self.command_for(index)?;
        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| PipelineError::CameraOpen {
                index,
                reason: format!("spawn {}: {err}", args[0]),
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("camera {index} capture has no stdout"))?;
        Ok(CommandFrameSource {
            child,
            reader: BufReader::new(stdout),
        })
    }
}

impl CameraBackend for CommandCamera {
    fn probe(&mut self, index: u32) -> bool {
        let Ok(mut source) = self.spawn(index) else {
            return false;
        };
        matches!(source.next_frame(), Ok(FrameRead::Frame(_)))
    }

    fn open(&mut self, index: u32) -> Result<Box<dyn FrameSource>> {
        let mut source = self.spawn(index)?;
        // The first frame proves the device actually opened.
        match source.next_frame() {
            Ok(FrameRead::Frame(_)) => Ok(Box::new(source)),
            Ok(_) => Err(PipelineError::CameraOpen {
                index,
                reason: "capture produced no frame".to_string(),
            }
            .into()),
            Err(err) => Err(PipelineError::CameraOpen {
                index,
                reason: format!("{err:#}"),
            }
            .into()),
        }
    }
}

struct CommandFrameSource {
    child: Child,
    reader: BufReader<ChildStdout>,
}

impl FrameSource for CommandFrameSource {
    fn next_frame(&mut self) -> Result<FrameRead> {
        match read_ppm_frame(&mut self.reader).context("read camera frame")? {
            Some(frame) => Ok(FrameRead::Frame(frame)),
            None => Ok(FrameRead::Ended),
        }
    }
}

impl Drop for CommandFrameSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
