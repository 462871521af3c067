//! Installed git version check.

use std::fmt;

use anyhow::{bail, Result};

use crate::utils::process::Process;

/// Oldest git release supported.
pub const MINIMUM_VERSION: GitVersion = GitVersion {
    major: 2,
    minor: 20,
    patch: 0,
};

/// A `major.minor.patch` git version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl GitVersion {
    /// Parses the output of `git --version`.
    ///
    /// Vendor suffixes are ignored: `git version 2.39.3 (Apple Git-146)` and
    /// `git version 2.45.1.windows.1` are both accepted.
    pub fn parse(output: &str) -> Option<Self> {
        let version = output.trim().strip_prefix("git version")?.split_whitespace().next()?;
        let mut parts = version.split('.').map(str::parse::<u32>);

        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);

        Some(Self {
            major,
            minor,
            patch,
        })
    }

    /// Asks git for its version.
    pub fn detect(process: &Process) -> Option<Self> {
        process
            .probe()
            .run_single_result(&["git", "--version"])
            .as_deref()
            .and_then(Self::parse)
    }

    /// Fails unless an installed git is at least [`MINIMUM_VERSION`].
    pub fn require(process: &Process) -> Result<Self> {
        match Self::detect(process) {
            Some(version) if version >= MINIMUM_VERSION => Ok(version),
            Some(version) => bail!(
                "Git {version} is too old, this tool requires git {MINIMUM_VERSION} or newer"
            ),
            None => bail!("Git must be installed, this tool requires git {MINIMUM_VERSION} or newer"),
        }
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
