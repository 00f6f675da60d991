//! Process execution for package manager and interpreter calls.
//!
//! Programs are always spawned directly with an argument vector, never
//! through a shell, so package names can't be interpreted as shell syntax.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::session::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors that prevent a command from producing a result.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (missing binary, permissions).
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran past its timeout and was killed.
    #[error("{program} timed out after {}s", .after.as_secs())]
    TimedOut { program: String, after: Duration },

    /// The caller cancelled the command and it was killed.
    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    fn from_status(status: ExitStatus, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: status.code(),
            stdout,
            stderr,
            duration,
            success: status.success(),
        }
    }

    /// Stdout and stderr joined, for pattern matching on failures.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Kill the process after this long.
    pub timeout: Option<Duration>,

    /// Kill the process when this token is cancelled.
    pub cancel: Option<CancelToken>,
}

impl CommandOptions {
    /// Options with only a timeout set.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }
}

/// Output line from command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    pub fn text(&self) -> &str {
        match self {
            Self::Stdout(s) | Self::Stderr(s) => s,
        }
    }
}

/// Callback for streaming output.
pub type OutputCallback = Box<dyn Fn(OutputLine) + Send>;

/// Render a program and its arguments for logs and error messages.
pub fn display_command(program: &Path, args: &[String]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

/// Execute a program and capture its output.
pub fn execute(program: &Path, args: &[String], options: &CommandOptions) -> Result<CommandResult, CommandError> {
    run(program, args, options, None)
}

/// Execute a program, passing each output line to `callback` as it arrives.
pub fn execute_streaming(
    program: &Path,
    args: &[String],
    options: &CommandOptions,
    callback: OutputCallback,
) -> Result<CommandResult, CommandError> {
    run(program, args, options, Some(callback))
}

fn run(
    program: &Path,
    args: &[String],
    options: &CommandOptions,
    callback: Option<OutputCallback>,
) -> Result<CommandResult, CommandError> {
    let start = Instant::now();
    let name = display_command(program, args);
    tracing::debug!("Running: {}", name);

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.display().to_string(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let stdout_handle = child
        .stdout
        .take()
        .map(|out| spawn_reader(out, tx.clone(), OutputLine::Stdout));
    let stderr_handle = child
        .stderr
        .take()
        .map(|err| spawn_reader(err, tx.clone(), OutputLine::Stderr));
    drop(tx);

    let mut streams_open = true;
    let status = loop {
        if streams_open {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if let Some(cb) = &callback {
                        cb(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => streams_open = false,
            }
        } else {
            thread::sleep(POLL_INTERVAL);
        }

        if !streams_open {
            if let Some(status) = child.try_wait().map_err(|source| CommandError::Spawn {
                program: program.display().to_string(),
                source,
            })? {
                break status;
            }
        }

        if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            kill(&mut child);
            tracing::debug!("Cancelled: {}", name);
            return Err(CommandError::Cancelled { program: name });
        }

        if let Some(timeout) = options.timeout {
            if start.elapsed() >= timeout {
                kill(&mut child);
                tracing::debug!("Timed out after {:?}: {}", timeout, name);
                return Err(CommandError::TimedOut {
                    program: name,
                    after: timeout,
                });
            }
        }
    };

    let stdout = stdout_handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();
    let stderr = stderr_handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default();

    Ok(CommandResult::from_status(
        status,
        stdout,
        stderr,
        start.elapsed(),
    ))
}

fn spawn_reader<R, F>(stream: R, tx: Sender<OutputLine>, wrap: F) -> JoinHandle<String>
where
    R: Read + Send + 'static,
    F: Fn(String) -> OutputLine + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        let mut output = String::new();
        for line in reader.lines().map_while(std::result::Result::ok) {
            output.push_str(&line);
            output.push('\n');
            let _ = tx.send(wrap(line));
        }
        output
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
