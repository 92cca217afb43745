//! Process plumbing for external collaborators.
//!
//! Commands are user-configured strings split with `shell-words`. Long-lived
//! workers exchange one JSON document per line over stdin/stdout; one-shot
//! commands print a JSON report as their last `{...}` stdout line.
use crate::error::PipelineError;
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Instant;

/// Split a configured command line into program and arguments.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let args =
        shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if args.is_empty() {
        return Err(anyhow!("command is empty"));
    }
    Ok(args)
}

/// Check that the program of a command line can be found.
pub fn resolve_program(label: &str, command: &str) -> Result<PathBuf> {
    let args = split_command(command)
        .map_err(|err| PipelineError::Configuration(format!("{label} command: {err}")))?;
    which::which(&args[0]).map_err(|err| {
        PipelineError::Configuration(format!("{label} command `{}` not found: {err}", args[0]))
            .into()
    })
}

/// A long-lived child speaking line-delimited JSON.
pub struct JsonLinesWorker {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl JsonLinesWorker {
    pub fn spawn(name: &str, command: &str, extra_args: &[String]) -> Result<Self> {
        let args = split_command(command)?;
        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawn {name} command: {}", args[0]))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("{name} worker has no stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("{name} worker has no stdout"))?;
        tracing::debug!(worker = name, pid = child.id(), "spawned worker");
        Ok(Self {
            name: name.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Send one request line and block for one response line.
    pub fn request<Req, Resp>(&mut self, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let mut line = serde_json::to_string(request)
            .with_context(|| format!("serialize {} request", self.name))?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .and_then(|_| self.stdin.flush())
            .with_context(|| format!("write {} request", self.name))?;

        let mut response = String::new();
        let read = self
            .stdout
            .read_line(&mut response)
            .with_context(|| format!("read {} response", self.name))?;
        if read == 0 {
            return Err(anyhow!("{} worker exited before responding", self.name));
        }
        serde_json::from_str(response.trim())
            .with_context(|| format!("parse {} response: {}", self.name, response.trim()))
    }
}

impl Drop for JsonLinesWorker {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        tracing::debug!(worker = %self.name, "worker stopped");
    }
}

/// Run a command to completion and parse its final JSON line.
pub fn run_json_command<T: DeserializeOwned>(
    name: &str,
    command: &str,
    extra_args: &[String],
) -> Result<T> {
    let args = split_command(command)?;
    let start = Instant::now();
    let output = Command::new(&args[0])
        .args(&args[1..])
        .args(extra_args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("spawn {name} command: {}", args[0]))?;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        stdout_bytes = output.stdout.len(),
        "{name} command complete"
    );

    if !output.status.success() {
        return Err(anyhow!("{name} command failed with status {}", output.status));
    }
    let stdout = String::from_utf8(output.stdout).context("decode stdout as UTF-8")?;
    let json_line = last_json_line(&stdout)
        .ok_or_else(|| anyhow!("{name} command printed no JSON report"))?;
    serde_json::from_str(json_line).with_context(|| format!("parse {name} report: {json_line}"))
}

fn last_json_line(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .rev()
        .find(|line| line.starts_with('{') && line.ends_with('}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_json_line_skips_trailing_log_noise() {
        let text = "epoch 1/3\n{\"a\": 1}\nepoch 2/3\n{\"a\": 2}\nsaved\n";
        assert_eq!(last_json_line(text), Some("{\"a\": 2}"));
        assert_eq!(last_json_line("no report"), None);
    }

    #[test]
    fn split_command_rejects_empty_lines() {
        assert!(split_command("   ").is_err());
        assert_eq!(
            split_command("python 'my detector.py' --fp16").expect("split"),
            vec!["python", "my detector.py", "--fp16"]
        );
    }
}
