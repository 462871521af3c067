//! User-facing console output.
//!
//! Diagnostics go through `tracing`; this module only handles what the user
//! is meant to read: command results on stdout, progress and status lines on
//! stderr. Progress lines are rewritten in place and messages are coloured
//! only when stderr is a terminal.

use std::cell::Cell;
use std::io::{self, IsTerminal, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};

/// How much the user asked to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Only results and errors.
    Quiet,
    /// Default level.
    #[default]
    Normal,
    /// `-v`
    Verbose,
    /// `-vv`: progress lines are kept instead of overwritten.
    VeryVerbose,
    /// `-vvv`
    Debug,
}

impl Verbosity {
    /// Maps the `-q` flag and the number of `-v` flags to a level.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::VeryVerbose,
            _ => Self::Debug,
        }
    }
}

/// Sink for user-facing messages.
pub trait Output {
    /// Returns the verbosity selected by the user.
    fn verbosity(&self) -> Verbosity;

    /// Writes a line to standard output.
    fn write(&self, message: &str, verbosity: Verbosity);

    /// Writes a line to standard error.
    fn write_error(&self, message: &str, verbosity: Verbosity);

    /// Replaces the line written by the previous overwrite.
    ///
    /// With `newline` false the line stays open so the next overwrite can
    /// replace it.
    fn overwrite(&self, message: &str, newline: bool, verbosity: Verbosity);

    /// Same as [`Output::overwrite`], for error messages.
    fn overwrite_error(&self, message: &str, newline: bool, verbosity: Verbosity);

    /// Returns true from `-vv` on.
    fn is_very_verbose(&self) -> bool {
        self.verbosity() >= Verbosity::VeryVerbose
    }

    /// Returns `text` in `color` when the output can render it, as is otherwise.
    fn paint(&self, text: &str, _color: Color) -> String {
        text.to_string()
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl Output for NullOutput {
    fn verbosity(&self) -> Verbosity {
        Verbosity::Quiet
    }

    fn write(&self, _message: &str, _verbosity: Verbosity) {}

    fn write_error(&self, _message: &str, _verbosity: Verbosity) {}

    fn overwrite(&self, _message: &str, _newline: bool, _verbosity: Verbosity) {}

    fn overwrite_error(&self, _message: &str, _newline: bool, _verbosity: Verbosity) {}
}

/// Terminal output.
#[derive(Debug)]
pub struct ConsoleOutput {
    verbosity: Verbosity,
    interactive: bool,
    open_line: Cell<bool>,
}

impl ConsoleOutput {
    /// Creates a console output, detecting whether stderr is a terminal.
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_terminal(verbosity, io::stderr().is_terminal())
    }

    fn with_terminal(verbosity: Verbosity, interactive: bool) -> Self {
        Self {
            verbosity,
            interactive,
            open_line: Cell::new(false),
        }
    }

    fn accepts(&self, verbosity: Verbosity) -> bool {
        verbosity <= self.verbosity
    }

    fn close_line(&self) {
        if self.open_line.replace(false) {
            eprintln!();
        }
    }

    fn replace_line(&self, message: &str, newline: bool) {
        let mut stderr = io::stderr();

        if !self.interactive {
            let _ = writeln!(stderr, "{message}");
            return;
        }

        if self.open_line.get() {
            let _ = execute!(stderr, MoveToColumn(0), Clear(ClearType::CurrentLine));
        }

        if newline {
            let _ = writeln!(stderr, "{message}");
        } else {
            let _ = write!(stderr, "{message}");
            let _ = stderr.flush();
        }
        self.open_line.set(!newline);
    }
}

impl Output for ConsoleOutput {
    fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn write(&self, message: &str, verbosity: Verbosity) {
        if self.accepts(verbosity) {
            self.close_line();
            println!("{message}");
        }
    }

    fn write_error(&self, message: &str, verbosity: Verbosity) {
        if self.accepts(verbosity) {
            self.close_line();
            eprintln!("{message}");
        }
    }

    fn overwrite(&self, message: &str, newline: bool, verbosity: Verbosity) {
        if self.accepts(verbosity) {
            self.replace_line(message, newline);
        }
    }

    fn overwrite_error(&self, message: &str, newline: bool, verbosity: Verbosity) {
        // Errors are shown even in quiet mode.
        if self.accepts(verbosity) || verbosity == Verbosity::Normal {
            self.replace_line(message, newline);
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.interactive {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Drop for ConsoleOutput {
    fn drop(&mut self) {
        self.close_line();
    }
}
