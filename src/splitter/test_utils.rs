//! Shared test utilities for the `splitter` module.

use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::splitter::SplitLog;
use crate::utils::output::{Output, Verbosity};
use crate::utils::process::{CommandLine, CommandOutput, CommandRunner, Process, ProcessError};

struct Rule {
    prefix: String,
    kind: RuleKind,
    remaining: Option<usize>,
}

enum RuleKind {
    Fail,
    Missing,
    Stdout(String),
}

#[derive(Default)]
struct State {
    commands: Vec<String>,
    timeouts: Vec<Option<Duration>>,
    rules: Vec<Rule>,
}

/// Command runner that records every command instead of running it.
///
/// Commands succeed with empty output unless a rule matches their display
/// form (`program arg1 arg2 ...`) by prefix. Rules are checked in the order
/// they were added; a rule with a count stops matching once used up.
///
/// ```ignore
/// let runner = ScriptedRunner::new()
///     .fail_times("git push", 1)          // first push rejected
///     .stdout("git --version", "git version 2.43.0");
/// let splitter = Splitter::new(runner.process(), output, adapters);
/// ```
#[derive(Clone, Default)]
pub(crate) struct ScriptedRunner {
    state: Arc<Mutex<State>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn rule(self, prefix: &str, kind: RuleKind, remaining: Option<usize>) -> Self {
        self.state.lock().unwrap().rules.push(Rule {
            prefix: prefix.to_string(),
            kind,
            remaining,
        });
        self
    }

    /// Every matching command exits with status 1.
    pub(crate) fn fail(self, prefix: &str) -> Self {
        self.rule(prefix, RuleKind::Fail, None)
    }

    /// The first `times` matching commands exit with status 1.
    pub(crate) fn fail_times(self, prefix: &str, times: usize) -> Self {
        self.rule(prefix, RuleKind::Fail, Some(times))
    }

    /// Matching commands cannot be spawned, as if the binary were not installed.
    pub(crate) fn missing(self, prefix: &str) -> Self {
        self.rule(prefix, RuleKind::Missing, None)
    }

    /// Matching commands print `stdout` and succeed.
    pub(crate) fn stdout(self, prefix: &str, stdout: &str) -> Self {
        self.rule(prefix, RuleKind::Stdout(stdout.to_string()), None)
    }

    /// Returns a [`Process`] backed by this runner.
    pub(crate) fn process(&self) -> Process {
        Process::with_runner(Arc::new(self.clone()), "/monorepo")
    }

    /// Returns every command run so far, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Returns the timeout each command ran with, in order.
    pub(crate) fn timeouts(&self) -> Vec<Option<Duration>> {
        self.state.lock().unwrap().timeouts.clone()
    }

    /// Counts the commands starting with `prefix`.
    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|command| command.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(
        &self,
        _work_dir: &Path,
        command: &CommandLine,
    ) -> Result<CommandOutput, ProcessError> {
        let display = command.to_string();
        let mut state = self.state.lock().unwrap();
        state.commands.push(display.clone());
        state.timeouts.push(command.timeout);

        let rule = state.rules.iter_mut().find(|rule| {
            display.starts_with(&rule.prefix) && rule.remaining.map_or(true, |left| left > 0)
        });

        let Some(rule) = rule else {
            return Ok(CommandOutput {
                code: Some(0),
                ..CommandOutput::default()
            });
        };
        if let Some(left) = rule.remaining.as_mut() {
            *left -= 1;
        }

        match &rule.kind {
            RuleKind::Fail => Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("scripted failure: {display}"),
            }),
            RuleKind::Missing => Err(ProcessError::Spawn {
                command: display,
                source: io::Error::new(io::ErrorKind::NotFound, "not installed"),
            }),
            RuleKind::Stdout(stdout) => Ok(CommandOutput {
                code: Some(0),
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
        }
    }
}

/// Progress sink that ignores everything.
pub(crate) struct NoopLog;

impl SplitLog for NoopLog {
    fn log_split(&self, _branch: &str, _library_path: &str, _message: &str, _verbosity: Verbosity) {}
}

/// Output that keeps every message, tagged with the method that produced it.
#[derive(Default)]
pub(crate) struct RecordingOutput {
    lines: RefCell<Vec<(&'static str, String)>>,
}

impl RecordingOutput {
    /// Returns every `(kind, message)` pair written so far.
    pub(crate) fn lines(&self) -> Vec<(&'static str, String)> {
        self.lines.borrow().clone()
    }

    /// Returns the last message written, if any.
    pub(crate) fn last(&self) -> Option<(&'static str, String)> {
        self.lines.borrow().last().cloned()
    }
}

impl Output for RecordingOutput {
    fn verbosity(&self) -> Verbosity {
        Verbosity::Debug
    }

    fn write(&self, message: &str, _verbosity: Verbosity) {
        self.lines.borrow_mut().push(("write", message.to_string()));
    }

    fn write_error(&self, message: &str, _verbosity: Verbosity) {
        self.lines
            .borrow_mut()
            .push(("write_error", message.to_string()));
    }

    fn overwrite(&self, message: &str, _newline: bool, _verbosity: Verbosity) {
        self.lines
            .borrow_mut()
            .push(("overwrite", message.to_string()));
    }

    fn overwrite_error(&self, message: &str, _newline: bool, _verbosity: Verbosity) {
        self.lines
            .borrow_mut()
            .push(("overwrite_error", message.to_string()));
    }
}
