//! CLI interface for subsplit.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;

use crate::config::ConfigPaths;
use crate::git::GitRepository;
use crate::utils::output::{ConsoleOutput, Output, Verbosity};

pub mod config;
pub mod split;
pub mod validate;

/// subsplit: splits the libraries of a monorepo into their own repositories.
#[derive(Parser)]
#[command(name = "subsplit")]
#[command(
    about = "Split the libraries of a monorepo into their own git repositories",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Use the given directory as the working directory.
    #[arg(short = 'd', long, global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Project configuration file (default: $SUBSPLIT_CONFIG or .subsplit.json).
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase the verbosity: -v verbose, -vv keep progress lines, -vvv debug.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print results and errors.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Print the elapsed time when the command ends.
    #[arg(long, global = true)]
    pub profile: bool,
}

impl GlobalArgs {
    /// Returns the directory commands work in.
    pub fn base_dir(&self) -> Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => fs::canonicalize(dir)
                .with_context(|| format!("Invalid working directory specified: {}", dir.display())),
            None => env::current_dir().context("Failed to determine the current directory"),
        }
    }

    /// Returns the verbosity selected by `-q` and `-v`.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    /// Creates the console output.
    pub fn output(&self) -> Rc<dyn Output> {
        Rc::new(ConsoleOutput::new(self.verbosity()))
    }

    /// Resolves the configuration file locations for `base_dir`.
    pub fn config_paths(&self, base_dir: &Path) -> Result<ConfigPaths> {
        Ok(ConfigPaths::resolve(base_dir, self.config.as_deref())?)
    }
}

/// URL of the first remote of the repository at `base_dir`, if any.
pub(crate) fn repository_url(base_dir: &Path) -> Option<String> {
    let url = GitRepository::open_at(base_dir)
        .ok()?
        .first_remote_url()
        .ok()
        .flatten();
    debug!(url = ?url, "Repository remote");
    url
}

/// Main commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Splits the libraries of the monorepo and pushes them to their repositories.
    Split(split::SplitCommand),
    /// Validates a configuration file.
    Validate(validate::ValidateCommand),
    /// Reads and edits the configuration.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Executes the CLI command and returns the process exit code.
    pub fn execute(self) -> Result<i32> {
        let started = Instant::now();
        let profile = self.global.profile;

        let code = match self.command {
            Commands::Split(split_cmd) => split_cmd.execute(&self.global),
            Commands::Validate(validate_cmd) => validate_cmd.execute(&self.global),
            Commands::Config(config_cmd) => config_cmd.execute(&self.global),
        }?;

        if profile {
            eprintln!("Time: {:.2}s", started.elapsed().as_secs_f64());
        }

        Ok(code)
    }
}
