//! Operator interaction: prompts, cooperative stop keys, and process interrupt.
//!
//! Capture and inference loops poll [`StopWatch::stop_requested`] once per
//! frame. `q`/`Esc` end a loop normally; `Ctrl-C` (or `SIGINT` outside raw
//! mode) marks the whole run as interrupted.
use crate::error::PipelineError;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route `SIGINT` into the interrupt flag instead of killing the process, so
/// the orchestrator gets to decide between rollback and retention.
///
/// Installed without `SA_RESTART`: a blocked prompt read fails with `EINTR`
/// and [`ConsoleOperator::ask`] returns [`PipelineError::Interrupted`].
pub fn install_interrupt_handler() -> Result<()> {
    let handler: extern "C" fn(libc::c_int) = on_sigint;
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe,
    // and the zeroed sigaction is fully initialised before use.
    let installed = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut())
    };
    if installed != 0 {
        return Err(io::Error::last_os_error()).context("install SIGINT handler");
    }
    Ok(())
}

/// Fail with [`PipelineError::Interrupted`] once `operator` saw an interrupt.
pub fn check_interrupted(operator: &dyn Operator) -> Result<()> {
    if operator.interrupted() {
        return Err(PipelineError::Interrupted.into());
    }
    Ok(())
}

/// The human in the loop.
pub trait Operator {
    /// Ask a question and return the trimmed answer.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Show an informational line.
    fn say(&mut self, message: &str);

    /// Start watching for stop keys.
    fn begin_watch(&mut self) -> Result<()>;

    /// Whether the operator asked to stop since the last poll.
    fn stop_requested(&mut self) -> Result<bool>;

    /// Stop watching for keys. Must be safe to call more than once.
    fn end_watch(&mut self);

    /// Whether the operator interrupted the whole run (`Ctrl-C`).
    fn interrupted(&self) -> bool;
}

/// Scoped key watch; restores the terminal when dropped.
pub struct StopWatch<'a> {
    operator: &'a mut dyn Operator,
}

impl<'a> StopWatch<'a> {
    pub fn start(operator: &'a mut dyn Operator) -> Result<Self> {
        operator.begin_watch()?;
        Ok(Self { operator })
    }

    pub fn stop_requested(&mut self) -> Result<bool> {
        if self.operator.interrupted() {
            return Ok(true);
        }
        self.operator.stop_requested()
    }

    pub fn say(&mut self, message: &str) {
        self.operator.say(message);
    }
}

impl Drop for StopWatch<'_> {
    fn drop(&mut self) {
        self.operator.end_watch();
    }
}

/// Stdin/stdout operator. Stop keys are read in raw mode when stdin is a TTY.
#[derive(Debug, Default)]
pub struct ConsoleOperator {
    raw_mode: bool,
}

impl ConsoleOperator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one line from stdin. `Ok(None)` means stdin is closed.
    fn read_answer(&self) -> Result<Option<String>> {
        let stdin = io::stdin();
        let mut lock = stdin.lock();
        let mut line = Vec::new();
        loop {
            let available = match lock.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    check_interrupted(self)?;
                    continue;
                }
                Err(err) => return Err(err).context("read operator answer"),
            };
            if available.is_empty() {
                break;
            }
            if let Some(end) = available.iter().position(|byte| *byte == b'\n') {
                line.extend_from_slice(&available[..=end]);
                lock.consume(end + 1);
                break;
            }
            let consumed = available.len();
            line.extend_from_slice(available);
            lock.consume(consumed);
        }
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }
}

impl Operator for ConsoleOperator {
    fn ask(&mut self, question: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{question} ").context("write prompt")?;
        stdout.flush().context("flush prompt")?;
        let answer = self.read_answer()?;
        check_interrupted(self)?;
        answer.ok_or_else(|| anyhow!("stdin closed while waiting for: {question}"))
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }

    fn begin_watch(&mut self) -> Result<()> {
        if !io::stdin().is_terminal() {
            return Ok(());
        }
        enable_raw_mode().context("enable raw terminal mode")?;
        self.raw_mode = true;
        Ok(())
    }

    fn stop_requested(&mut self) -> Result<bool> {
        if !self.raw_mode {
            return Ok(false);
        }
        while event::poll(Duration::ZERO).context("poll terminal events")? {
            let Event::Key(key) = event::read().context("read terminal event")? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    INTERRUPTED.store(true, Ordering::SeqCst);
                    return Ok(true);
                }
                KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                _ => {}
            }
        }
        Ok(false)
    }

    fn end_watch(&mut self) {
        if self.raw_mode {
            if let Err(err) = disable_raw_mode() {
                tracing::warn!("failed to restore terminal mode: {err}");
            }
            self.raw_mode = false;
        }
    }

    fn interrupted(&self) -> bool {
        INTERRUPTED.load(Ordering::SeqCst)
    }
}

impl Drop for ConsoleOperator {
    fn drop(&mut self) {
        self.end_watch();
    }
}
