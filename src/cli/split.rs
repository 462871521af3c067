//! Split command: pushes the history of each changed library to its repository.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::style::Color;
use tracing::{debug, info};

use crate::cli::GlobalArgs;
use crate::config::Config;
use crate::git::{affected_libraries, modified_files, GitRepository, GitVersion};
use crate::splitter::Splitter;
use crate::utils::naming::is_splittable;
use crate::utils::output::Verbosity;
use crate::utils::process::Process;

/// Split command options.
#[derive(Parser)]
pub struct SplitCommand {
    /// Library paths to split; every configured library when omitted.
    #[arg(value_name = "LIBRARY")]
    pub libraries: Vec<String>,

    /// Number of commits inspected for modified files.
    #[arg(short = 'D', long, default_value_t = 1)]
    pub depth: u32,

    /// Remote of the monorepo; the first remote when omitted.
    #[arg(short = 'R', long)]
    pub remote: Option<String>,

    /// Also split every remote branch matching the branch pattern.
    #[arg(short = 'A', long)]
    pub all: bool,

    /// Branch to split, repeatable; the configured branches or the current
    /// branch when omitted.
    #[arg(short = 'b', long = "branch", value_name = "BRANCH")]
    pub branches: Vec<String>,

    /// Splitter adapter: auto, splitsh-lite or git-subtree.
    #[arg(long, value_name = "NAME")]
    pub adapter: Option<String>,

    /// Never rebuild a library branch from scratch nor force the push.
    #[arg(long)]
    pub no_scratch: bool,
}

impl SplitCommand {
    /// Executes the split command.
    pub fn execute(self, global: &GlobalArgs) -> Result<i32> {
        let base_dir = global.base_dir()?;
        let output = global.output();

        let repo = GitRepository::open_at(&base_dir)
            .context("The working directory is not managed by git")?;
        let paths = global.config_paths(&base_dir)?;
        let config = Config::load(paths, repo.first_remote_url()?.as_deref())
            .context("Failed to load the configuration")?;
        if !config.has_project_file() {
            bail!(
                "Could not find the config file {}",
                config.paths().project_file.display()
            );
        }
        let settings = config
            .settings()
            .context("Failed to load the configuration")?;

        let process = Process::new(&base_dir)
            .with_binaries(settings.binaries.clone())
            .with_timeouts(settings.timeouts());
        let version = GitVersion::require(&process)?;
        debug!(%version, "Git version");

        if self.depth < 1 {
            bail!("Git history depth must be greater than or equal to 1");
        }

        let remote = select_remote(self.remote.as_deref(), &repo.remotes()?)?;
        let branches = select_branches(&BranchQuery {
            requested: &self.branches,
            configured: &settings.default_branches(),
            current: repo.current_branch()?,
            remote_branches: &repo.remote_branch_names(&remote)?,
            all: self.all,
            pattern: settings.branch_pattern.as_deref(),
        })?;
        let libraries = select_libraries(&base_dir, &settings.libraries, &self.libraries)?;

        let mut splitter = Splitter::with_default_adapters(process.clone(), output.clone());
        splitter.set_adapter(self.adapter.as_deref().or(settings.adapter.as_deref()))?;
        let adapter = splitter.adapter()?.name();
        output.write(
            &format!("Splitter adapter used: {}", output.paint(adapter, Color::Green)),
            Verbosity::Verbose,
        );

        if branches.is_empty() {
            output.write("No branch to split", Verbosity::Normal);
            return Ok(0);
        }

        let allow_scratch = !self.no_scratch;
        let mut success = true;

        for branch in &branches {
            let files = modified_files(&process, &remote, branch, self.depth);
            let affected = affected_libraries(&libraries, &files);

            if affected.is_empty() {
                output.write(
                    &output.paint(&format!("[{branch}] No library to split"), Color::Green),
                    Verbosity::Normal,
                );
                continue;
            }

            let staged = splitter
                .stage(&remote, branch)
                .with_context(|| format!("Failed to prepare the \"{branch}\" branch"))?;
            for library in affected {
                success = staged.split(library, &libraries[library], allow_scratch) && success;
            }
            staged.finish();
        }

        info!(success, "Split finished");
        Ok(if success { 0 } else { 1 })
    }
}

/// Picks the remote to split from.
fn select_remote(requested: Option<&str>, remotes: &[String]) -> Result<String> {
    let Some(first) = remotes.first() else {
        bail!("No Git remote is available in the repository");
    };
    let remote = requested.unwrap_or(first);

    if !remotes.iter().any(|name| name == remote) {
        bail!(
            "Git remote \"{remote}\" does not exist, available remotes: {}",
            remotes.join(", ")
        );
    }
    Ok(remote.to_string())
}

/// Inputs of the branch selection.
struct BranchQuery<'a> {
    requested: &'a [String],
    configured: &'a [String],
    current: Option<String>,
    remote_branches: &'a [String],
    all: bool,
    pattern: Option<&'a str>,
}

/// Lists the branches to split, in order and without duplicates.
///
/// Explicit branches win over configured ones, which win over the current
/// branch. `--all` adds the splittable remote branches. Every branch must
/// exist on the remote.
fn select_branches(query: &BranchQuery<'_>) -> Result<Vec<String>> {
    let mut branches: Vec<String> = if !query.requested.is_empty() {
        query.requested.to_vec()
    } else if !query.configured.is_empty() {
        query.configured.to_vec()
    } else {
        query.current.iter().cloned().collect()
    };

    if query.remote_branches.is_empty() {
        bail!("No Git branch is available in the repository");
    }

    if query.all {
        for name in query.remote_branches {
            if is_splittable(name, query.pattern).context("Invalid branch-pattern")? {
                branches.push(name.clone());
            }
        }
    }

    let mut unique: Vec<String> = Vec::with_capacity(branches.len());
    for branch in branches {
        if !unique.contains(&branch) {
            unique.push(branch);
        }
    }

    for branch in &unique {
        if !query.remote_branches.contains(branch) {
            bail!("The \"{branch}\" branch does not exist in Git repository");
        }
    }

    Ok(unique)
}

/// Narrows the configured libraries to the requested ones present on disk.
fn select_libraries(
    base_dir: &Path,
    configured: &BTreeMap<String, String>,
    requested: &[String],
) -> Result<BTreeMap<String, String>> {
    if configured.is_empty() {
        bail!("No library is configured for the splitting");
    }

    for library in requested {
        if !configured.contains_key(library) {
            bail!("The library path \"{library}\" is not configured for the splitting");
        }
        if !base_dir.join(library).is_dir() {
            bail!("The library path \"{library}\" does not exist in the current project");
        }
    }

    Ok(configured
        .iter()
        .filter(|(path, _)| requested.is_empty() || requested.contains(path))
        .filter(|(path, _)| {
            let exists = base_dir.join(path).is_dir();
            if !exists {
                debug!(library = %path, "Configured library not found, skipped");
            }
            exists
        })
        .map(|(path, url)| (path.clone(), url.clone()))
        .collect())
}
