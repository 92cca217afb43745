//! In-memory collaborators shared by unit tests.
use crate::camera::{CameraBackend, FrameRead, FrameSource};
use crate::dataset::PixelBox;
use crate::error::PipelineError;
use crate::external::{
    Detection, Detector, DetectorThresholds, Predictor, PredictorFactory, TrainReport,
    TrainRequest, Trainer,
};
use crate::operator::Operator;
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::cell::Cell;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const FRAME_WIDTH: u32 = 64;
pub const FRAME_HEIGHT: u32 = 48;

pub fn solid_frame(value: u8) -> RgbImage {
    RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([value, value, value]))
}

pub struct ScriptedOperator {
    answers: VecDeque<String>,
    asked: usize,
    messages: Vec<String>,
    stop_after_polls: Option<usize>,
    interrupt_after_polls: Option<usize>,
    interrupt_on_question: Option<usize>,
    interrupted: bool,
    polls: usize,
    watch_ends: usize,
}

impl ScriptedOperator {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: 0,
            messages: Vec::new(),
            stop_after_polls: None,
            interrupt_after_polls: None,
            interrupt_on_question: None,
            interrupted: false,
            polls: 0,
            watch_ends: 0,
        }
    }

    /// Request a stop on the `polls`-th poll.
    pub fn stopping_after(mut self, polls: usize) -> Self {
        self.stop_after_polls = Some(polls);
        self
    }

    /// Press `Ctrl-C` on the `polls`-th poll.
    pub fn interrupting_after(mut self, polls: usize) -> Self {
        self.interrupt_after_polls = Some(polls);
        self
    }

    /// Press `Ctrl-C` while the `question`-th question is pending.
    pub fn interrupting_on_question(mut self, question: usize) -> Self {
        self.interrupt_on_question = Some(question);
        self
    }

    pub fn questions_asked(&self) -> usize {
        self.asked
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn watch_ends(&self) -> usize {
        self.watch_ends
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.asked += 1;
        if self.interrupt_on_question == Some(self.asked) {
            self.interrupted = true;
            return Err(PipelineError::Interrupted.into());
        }
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted answer for: {question}"))
    }

    fn say(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn begin_watch(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_requested(&mut self) -> Result<bool> {
        self.polls += 1;
        if self.interrupt_after_polls.is_some_and(|n| self.polls >= n) {
            self.interrupted = true;
            return Ok(true);
        }
        Ok(self.stop_after_polls.is_some_and(|n| self.polls >= n))
    }

    fn end_watch(&mut self) {
        self.watch_ends += 1;
    }

    fn interrupted(&self) -> bool {
        self.interrupted
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FakeFrame {
    Frame(u8),
    Unreadable,
    Fail,
}

/// Camera with a fixed device set. Without a script every open device yields
/// frames forever.
pub struct FakeCamera {
    devices: BTreeSet<u32>,
    script: Option<Vec<FakeFrame>>,
    opened: Rc<Cell<usize>>,
    released: Rc<Cell<usize>>,
}

impl FakeCamera {
    pub fn with_devices(devices: &[u32]) -> Self {
        Self {
            devices: devices.iter().copied().collect(),
            script: None,
            opened: Rc::new(Cell::new(0)),
            released: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_script(mut self, script: Vec<FakeFrame>) -> Self {
        self.script = Some(script);
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }

    pub fn released(&self) -> usize {
        self.released.get()
    }
}

impl CameraBackend for FakeCamera {
    fn probe(&mut self, index: u32) -> bool {
        self.devices.contains(&index)
    }

    fn open(&mut self, index: u32) -> Result<Box<dyn FrameSource>> {
        if !self.devices.contains(&index) {
            return Err(anyhow!("fake camera {index} does not exist"));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(Box::new(FakeSource {
            script: self.script.clone().map(VecDeque::from),
            counter: 0,
            released: Rc::clone(&self.released),
        }))
    }
}

struct FakeSource {
    script: Option<VecDeque<FakeFrame>>,
    counter: u8,
    released: Rc<Cell<usize>>,
}

impl FrameSource for FakeSource {
    fn next_frame(&mut self) -> Result<FrameRead> {
        let step = match self.script.as_mut() {
            None => {
                self.counter = self.counter.wrapping_add(1);
                FakeFrame::Frame(self.counter)
            }
            Some(script) => match script.pop_front() {
                Some(step) => step,
                None => return Ok(FrameRead::Ended),
            },
        };
        match step {
            FakeFrame::Frame(value) => Ok(FrameRead::Frame(solid_frame(value))),
            FakeFrame::Unreadable => Ok(FrameRead::Unreadable),
            FakeFrame::Fail => Err(anyhow!("fake camera failure")),
        }
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

/// Detector answering from a repeating hit pattern.
pub struct FakeDetector {
    pattern: Vec<bool>,
    bbox: PixelBox,
    score: f32,
    pub calls: usize,
    pub phrases: Vec<String>,
    fail_on_call: Option<usize>,
}

impl FakeDetector {
    pub fn always() -> Self {
        Self::with_pattern(&[true])
    }

    pub fn with_pattern(pattern: &[bool]) -> Self {
        Self {
            pattern: pattern.to_vec(),
            bbox: PixelBox::new(16.0, 12.0, 48.0, 36.0),
            score: 0.8,
            calls: 0,
            phrases: Vec::new(),
            fail_on_call: None,
        }
    }

    /// Report hits with `score`, whatever thresholds were asked for.
    pub fn scoring(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl Detector for FakeDetector {
    fn detect(
        &mut self,
        _frame: &RgbImage,
        phrase: &str,
        _thresholds: DetectorThresholds,
    ) -> Result<Vec<Detection>> {
        self.calls += 1;
        self.phrases.push(phrase.to_string());
        if self.fail_on_call == Some(self.calls) {
            return Err(anyhow!("fake detector crashed"));
        }
        let hit = self.pattern[(self.calls - 1) % self.pattern.len()];
        Ok(if hit {
            vec![Detection::new(self.bbox, phrase, self.score)]
        } else {
            Vec::new()
        })
    }
}

pub struct FakeTrainer {
    all_ap: Vec<f64>,
    pub requests: Vec<(PathBuf, u32, String)>,
    fail: bool,
}

impl FakeTrainer {
    pub fn with_metric(metric: f64) -> Self {
        Self {
            all_ap: vec![metric],
            requests: Vec::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_metric(0.0)
        }
    }
}

impl Trainer for FakeTrainer {
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainReport> {
        self.requests.push((
            request.config_path.to_path_buf(),
            request.epochs,
            request.device.to_string(),
        ));
        if self.fail {
            return Err(anyhow!("fake trainer failed"));
        }
        Ok(TrainReport {
            save_dir: request.project_dir.join("train"),
            all_ap: self.all_ap.clone(),
        })
    }
}

/// Predictor factory whose predictors hit on every `every`-th frame.
pub struct FakePredictorFactory {
    every: usize,
    pub opened: Vec<PathBuf>,
}

impl FakePredictorFactory {
    pub fn hitting_every(every: usize) -> Self {
        Self {
            every,
            opened: Vec::new(),
        }
    }
}

impl PredictorFactory for FakePredictorFactory {
    fn open(&mut self, weights: &Path) -> Result<Box<dyn Predictor>> {
        self.opened.push(weights.to_path_buf());
        Ok(Box::new(FakePredictor {
            every: self.every,
            calls: 0,
        }))
    }
}

struct FakePredictor {
    every: usize,
    calls: usize,
}

impl Predictor for FakePredictor {
    fn predict(&mut self, _frame: &RgbImage, conf: f32) -> Result<Vec<Detection>> {
        self.calls += 1;
        if self.calls % self.every == 0 {
            return Ok(vec![Detection::new(
                PixelBox::new(4.0, 4.0, 20.0, 20.0),
                "mug",
                conf.max(0.9),
            )]);
        }
        Ok(Vec::new())
    }
}
