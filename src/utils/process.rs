//! Blocking execution of external commands.
//!
//! A single primitive ([`CommandRunner::execute`]) runs a command to
//! completion. [`Process`] layers the result shapes used by the rest of the
//! crate on top of it: success flag, single trimmed line, list of lines.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Timeout applied to availability probes such as `--version` calls.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors raised while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No program was given.
    #[error("Cannot run an empty command")]
    Empty,

    /// The program could not be started or waited on.
    #[error("Failed to execute `{command}`: {source}")]
    Spawn {
        /// Command line as displayed to the user.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("Command `{command}` failed: {message}")]
    Failed {
        /// Command line as displayed to the user.
        command: String,
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Captured stderr, or stdout when stderr was empty.
        message: String,
    },

    /// The program did not finish in time and was killed.
    #[error("Command `{command}` timed out after {}s", .timeout.as_secs_f32())]
    TimedOut {
        /// Command line as displayed to the user.
        command: String,
        /// Timeout that expired.
        timeout: Duration,
    },
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path.
    pub program: String,
    /// Arguments, without the program.
    pub args: Vec<String>,
    /// Kill the command after this long; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, absent when killed by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true when the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs one command to completion.
pub trait CommandRunner: Send + Sync {
    /// Executes `command` in `work_dir` and captures its output.
    ///
    /// A non-zero exit status is not an error at this level.
    fn execute(&self, work_dir: &Path, command: &CommandLine)
        -> Result<CommandOutput, ProcessError>;
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(
        &self,
        work_dir: &Path,
        command: &CommandLine,
    ) -> Result<CommandOutput, ProcessError> {
        let spawn_error = |source| ProcessError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Drain both pipes concurrently so a chatty command cannot block on a full pipe.
        let stdout = child.stdout.take().map(read_pipe);
        let stderr = child.stderr.take().map(read_pipe);

        let status = match command.timeout {
            None => child.wait().map(Some),
            Some(timeout) => wait_with_timeout(&mut child, timeout),
        }
        .map_err(spawn_error)?;

        match status {
            Some(status) => Ok(CommandOutput {
                code: status.code(),
                stdout: collect_pipe(stdout),
                stderr: collect_pipe(stderr),
            }),
            None => Err(ProcessError::TimedOut {
                command: command.to_string(),
                timeout: command.timeout.unwrap_or_default(),
            }),
        }
    }
}

fn read_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn collect_pipe(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Polls the child until it exits; returns `None` after killing it on timeout.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Timeouts applied to commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Regular commands (fetch, push, subtree split). `None` is unbounded.
    pub command: Option<Duration>,
    /// Availability probes.
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command: None,
            probe: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Command execution bound to a working directory.
///
/// Cloning is cheap; all clones share the same runner.
#[derive(Clone)]
pub struct Process {
    runner: Arc<dyn CommandRunner>,
    work_dir: PathBuf,
    binaries: BTreeMap<String, String>,
    timeouts: Timeouts,
    timeout: Option<Duration>,
}

impl Process {
    /// Creates a process runner spawning real child processes in `work_dir`.
    pub fn new<P: Into<PathBuf>>(work_dir: P) -> Self {
        Self::with_runner(Arc::new(SystemRunner), work_dir)
    }

    /// Creates a process runner on top of a custom [`CommandRunner`].
    pub fn with_runner<P: Into<PathBuf>>(runner: Arc<dyn CommandRunner>, work_dir: P) -> Self {
        let timeouts = Timeouts::default();
        Self {
            runner,
            work_dir: work_dir.into(),
            binaries: BTreeMap::new(),
            timeout: timeouts.command,
            timeouts,
        }
    }

    /// Replaces program names with custom binary paths (`git` -> `/opt/git/bin/git`).
    pub fn with_binaries(mut self, binaries: BTreeMap<String, String>) -> Self {
        self.binaries = binaries;
        self
    }

    /// Sets the timeouts used by this runner and the probes derived from it.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self.timeout = timeouts.command;
        self
    }

    /// Returns a runner using the probe timeout, for availability checks.
    pub fn probe(&self) -> Self {
        let mut probe = self.clone();
        probe.timeout = Some(self.timeouts.probe);
        probe
    }

    fn command_line(&self, command: &[&str]) -> Result<CommandLine, ProcessError> {
        let (program, args) = command.split_first().ok_or(ProcessError::Empty)?;
        let program = self
            .binaries
            .get(*program)
            .map_or_else(|| (*program).to_string(), Clone::clone);

        Ok(CommandLine {
            program,
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
            timeout: self.timeout,
        })
    }

    /// Runs a command and returns its captured output, whatever its exit status.
    pub fn execute(&self, command: &[&str]) -> Result<CommandOutput, ProcessError> {
        let line = self.command_line(command)?;
        debug!(command = %line, "Running command");
        let output = self.runner.execute(&self.work_dir, &line)?;
        debug!(command = %line, code = ?output.code, "Command finished");
        Ok(output)
    }

    /// Runs a command and reports whether it succeeded; never fails.
    pub fn run(&self, command: &[&str]) -> bool {
        match self.execute(command) {
            Ok(output) => output.success(),
            Err(err) => {
                debug!("{err}");
                false
            }
        }
    }

    /// Runs a command and fails unless it exits with status 0.
    pub fn run_checked(&self, command: &[&str]) -> Result<(), ProcessError> {
        let output = self.execute(command)?;
        if output.success() {
            return Ok(());
        }

        Err(ProcessError::Failed {
            command: command.join(" "),
            code: output.code,
            message: output.failure_message(),
        })
    }

    /// Returns the trimmed standard output, or `None` when it is empty or the
    /// command could not run.
    pub fn run_single_result(&self, command: &[&str]) -> Option<String> {
        let output = match self.execute(command) {
            Ok(output) => output,
            Err(err) => {
                debug!("{err}");
                return None;
            }
        };

        let stdout = output.stdout.trim();
        (!stdout.is_empty()).then(|| stdout.to_string())
    }

    /// Returns the non-empty lines of standard output, in order.
    pub fn run_array_result(&self, command: &[&str]) -> Vec<String> {
        match self.execute(command) {
            Ok(output) => output
                .stdout
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect(),
            Err(err) => {
                debug!("{err}");
                Vec::new()
            }
        }
    }
}
