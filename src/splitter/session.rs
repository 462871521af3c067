//! Names and cleanup for one `(branch, library)` split.

use tracing::debug;

use crate::splitter::SplitLog;
use crate::utils::naming::{library_branch_name, remote_alias, subtree_branch_name};
use crate::utils::output::Verbosity;
use crate::utils::process::Process;

/// The transient git objects used to split one library of one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSession {
    /// Source branch being split.
    pub branch: String,
    /// Library directory inside the monorepo.
    pub library_path: String,
    /// Working branch staging the source branch (`subtree__<branch>`).
    pub subtree_branch: String,
    /// Branch receiving the library history.
    pub library_branch: String,
    /// Remote alias pointing at the library repository.
    pub remote_alias: String,
}

impl SplitSession {
    /// Derives every name from the branch and the library path.
    pub fn new(branch: &str, library_path: &str) -> Self {
        let subtree_branch = subtree_branch_name(branch);
        Self {
            branch: branch.to_string(),
            library_path: library_path.to_string(),
            library_branch: library_branch_name(&subtree_branch, library_path),
            remote_alias: remote_alias(library_path),
            subtree_branch,
        }
    }

    /// Returns `<alias>/<branch>`, the library's copy of the source branch.
    pub fn remote_branch(&self) -> String {
        format!("{}/{}", self.remote_alias, self.branch)
    }
}

/// Deletes the library branch and the remote alias when dropped.
///
/// Failures are only traced: a cleanup problem must never replace the
/// outcome of the split itself.
pub(crate) struct SessionCleanup<'a> {
    process: &'a Process,
    log: &'a dyn SplitLog,
    session: &'a SplitSession,
}

impl<'a> SessionCleanup<'a> {
    pub(crate) fn new(process: &'a Process, log: &'a dyn SplitLog, session: &'a SplitSession) -> Self {
        Self {
            process,
            log,
            session,
        }
    }
}

impl Drop for SessionCleanup<'_> {
    fn drop(&mut self) {
        let session = self.session;
        self.log.log_split(
            &session.branch,
            &session.library_path,
            "Clean working branch and remote...",
            Verbosity::Normal,
        );

        if !self
            .process
            .run(&["git", "branch", "-D", &session.library_branch])
        {
            debug!(branch = %session.library_branch, "Library branch was not deleted");
        }
        if !self
            .process
            .run(&["git", "remote", "rm", &session.remote_alias])
        {
            debug!(remote = %session.remote_alias, "Remote alias was not removed");
        }
    }
}
