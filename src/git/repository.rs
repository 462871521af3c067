//! Git repository operations

use std::path::Path;

use anyhow::{Context, Result};
use git2::{BranchType, ErrorCode, Repository};

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Get the remote names, in the order git lists them
    pub fn remotes(&self) -> Result<Vec<String>> {
        let remotes = self.repo.remotes().context("Failed to list remotes")?;

        Ok(remotes.iter().flatten().map(String::from).collect())
    }

    /// Get the fetch URL of a remote
    pub fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read remote: {name}")),
        }
    }

    /// Get the URL of the first remote, used to key per-repository settings
    pub fn first_remote_url(&self) -> Result<Option<String>> {
        match self.remotes()?.first() {
            Some(name) => self.remote_url(name),
            None => Ok(None),
        }
    }

    /// Get the checked out branch, `None` when HEAD is detached or unborn
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e).context("Failed to get HEAD reference"),
        };

        if !head.is_branch() {
            return Ok(None);
        }

        Ok(head.shorthand().map(String::from))
    }

    /// Get the branch names known for a remote (`refs/remotes/<remote>/*`),
    /// without the remote prefix and without `HEAD`
    pub fn remote_branch_names(&self, remote: &str) -> Result<Vec<String>> {
        let prefix = format!("{remote}/");
        let branches = self
            .repo
            .branches(Some(BranchType::Remote))
            .context("Failed to list remote branches")?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.context("Failed to read remote branch")?;
            let Some(name) = branch.name().context("Failed to read branch name")? else {
                continue;
            };
            if let Some(short) = name.strip_prefix(&prefix) {
                if short != "HEAD" {
                    names.push(short.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
