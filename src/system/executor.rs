// src/system/executor.rs

use crate::constants::MAX_CAPTURE_BYTES;
use std::io::{self, Read};
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Interval between two checks of a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    Spawn(String, #[source] std::io::Error),
    #[error("Waiting for command '{0}' failed: {1}")]
    Wait(String, #[source] std::io::Error),
    #[error("timeout")]
    Timeout,
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `-1` when the process was terminated by a signal.
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

/// The "run this command, get back a result" primitive the gateway depends on.
pub trait ProcessRunner {
    /// Runs `command_line` through the platform shell and waits for it, at most `timeout`.
    fn run(&self, command_line: &str, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

/// Runs commands with `sh -c` (`cmd /C` on Windows), capturing both streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ProcessRunner for ShellRunner {
    fn run(&self, command_line: &str, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let trimmed = command_line.trim();
        if trimmed.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }

        let mut child = shell_command(trimmed)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::Spawn(trimmed.to_string(), e))?;

        // Both pipes are drained concurrently; a full pipe would stall the child.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        let status: ExitStatus = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() >= timeout {
                        log::debug!(
                            "Timeout after {:?}, killing child process (PID: {})...",
                            timeout,
                            child.id()
                        );
                        if let Err(e) = child.kill() {
                            log::warn!("Failed to kill child process {}: {}", child.id(), e);
                        }
                        child.wait().ok();
                        // Readers are left detached: grandchildren may still hold the pipes open.
                        return Err(RunnerError::Timeout);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(RunnerError::Wait(trimmed.to_string(), e)),
            }
        };

        // A backgrounded grandchild can keep the pipes open after the shell exits.
        Ok(ProcessOutput {
            returncode: status.code().unwrap_or(-1),
            stdout: collect_reader(stdout_reader, deadline)?,
            stderr: collect_reader(stderr_reader, deadline)?,
        })
    }
}

fn shell_command(command_line: &str) -> StdCommand {
    if cfg!(target_os = "windows") {
        let mut command = StdCommand::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = StdCommand::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

/// Drains `stream` on its own thread. At most `MAX_CAPTURE_BYTES` are kept; the rest is
/// read and discarded so the writer never blocks on a full pipe.
fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Option<Receiver<String>> {
    stream.map(|mut stream| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let limit = u64::try_from(MAX_CAPTURE_BYTES).unwrap_or(u64::MAX);
            let mut buffer = Vec::new();
            if let Err(e) = stream.by_ref().take(limit).read_to_end(&mut buffer) {
                log::debug!("Reading child output failed: {}", e);
            }
            if let Err(e) = io::copy(&mut stream, &mut io::sink()) {
                log::debug!("Draining child output failed: {}", e);
            }
            // The receiver is gone once the run has timed out.
            tx.send(clamp_output(String::from_utf8_lossy(&buffer).into_owned()))
                .ok();
        });
        rx
    })
}

/// Waits for a reader until `deadline`. `None` means no deadline.
fn collect_reader(
    reader: Option<Receiver<String>>,
    deadline: Option<Instant>,
) -> Result<String, RunnerError> {
    let Some(reader) = reader else {
        return Ok(String::new());
    };
    let received = match deadline {
        Some(deadline) => {
            reader.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        }
        None => reader.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(text) => Ok(text),
        Err(RecvTimeoutError::Timeout) => {
            log::debug!("Output pipes still open at the deadline, giving up on them.");
            Err(RunnerError::Timeout)
        }
        Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
    }
}

/// Cuts `text` to at most `MAX_CAPTURE_BYTES`, on a character boundary.
pub fn clamp_output(mut text: String) -> String {
    if text.len() <= MAX_CAPTURE_BYTES {
        return text;
    }
    let mut cut = MAX_CAPTURE_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}
