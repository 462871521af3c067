//! # subsplit
//!
//! Splits the libraries of a monorepo into their own git repositories,
//! keeping their history, one branch at a time.
//!
//! ## Features
//!
//! - Pluggable history extraction: `splitsh-lite` when installed, `git subtree` otherwise
//! - Only the libraries touched by recent commits are split
//! - The repository is left as it was found, whatever the outcome
//! - Layered JSON configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use subsplit::splitter::Splitter;
//! use subsplit::utils::{ConsoleOutput, Process, Verbosity};
//!
//! let process = Process::new("/path/to/monorepo");
//! let splitter = Splitter::with_default_adapters(process, Rc::new(ConsoleOutput::new(Verbosity::Normal)));
//!
//! let staged = splitter.stage("origin", "main")?;
//! let pushed = staged.split("src/LibA", "git@github.com:org/lib-a.git", true);
//! staged.finish();
//! println!("pushed: {pushed}");
//! # Ok::<(), subsplit::splitter::SplitterError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod git;
pub mod splitter;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of subsplit.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
