//! Validate command.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use crossterm::style::Color;

use crate::cli::GlobalArgs;
use crate::config::ConfigValidator;
use crate::utils::output::{Output, Verbosity};

/// Exit code for validation warnings with `--strict`.
pub const EXIT_WARNINGS: i32 = 1;
/// Exit code for validation errors.
pub const EXIT_ERRORS: i32 = 2;
/// Exit code for a missing or unreadable file.
pub const EXIT_UNREADABLE: i32 = 3;

/// Validate command options.
#[derive(Parser)]
#[command(after_help = "Exit codes: 1 warnings (with --strict), 2 errors, 3 file unreadable or missing")]
pub struct ValidateCommand {
    /// Configuration file to validate; the project file when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Return a non-zero exit code for warnings as well as errors.
    #[arg(long)]
    pub strict: bool,
}

impl ValidateCommand {
    /// Executes the validate command.
    pub fn execute(self, global: &GlobalArgs) -> Result<i32> {
        let base_dir = global.base_dir()?;
        let path = match &self.file {
            Some(file) => base_dir.join(file),
            None => global.config_paths(&base_dir)?.project_file,
        };

        Ok(validate_file(&path, self.strict, global.output().as_ref()))
    }
}

/// Validates `path`, reports the findings and returns the exit code.
fn validate_file(path: &Path, strict: bool, output: &dyn Output) -> i32 {
    let name = path.display().to_string();

    if !path.is_file() {
        output.write_error(&output.paint(&format!("{name} not found."), Color::Red), Verbosity::Quiet);
        return EXIT_UNREADABLE;
    }
    if File::open(path).is_err() {
        output.write_error(&output.paint(&format!("{name} is not readable."), Color::Red), Verbosity::Quiet);
        return EXIT_UNREADABLE;
    }

    let (errors, warnings) = ConfigValidator::new().validate(path);

    if !errors.is_empty() {
        output.write_error(
            &output.paint(
                &format!("{name} is invalid, the following errors/warnings were found:"),
                Color::Red,
            ),
            Verbosity::Quiet,
        );
    } else if !warnings.is_empty() {
        output.write_error(
            &output.paint(&format!("{name} is valid, but with a few warnings"), Color::Green),
            Verbosity::Normal,
        );
    } else {
        output.write(&output.paint(&format!("{name} is valid"), Color::Green), Verbosity::Normal);
    }

    for message in &errors {
        output.write_error(&output.paint(&format!("[error] {message}"), Color::Red), Verbosity::Quiet);
    }
    for message in &warnings {
        output.write_error(&output.paint(&format!("[warning] {message}"), Color::Yellow), Verbosity::Quiet);
    }

    if !errors.is_empty() {
        EXIT_ERRORS
    } else if strict && !warnings.is_empty() {
        EXIT_WARNINGS
    } else {
        0
    }
}
