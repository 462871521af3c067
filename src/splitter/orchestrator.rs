//! The splitter: owns the repository state for the duration of a run.
//!
//! The checked-out branch and the registered remotes are shared by every git
//! command, so all work happens sequentially through one [`Splitter`]:
//!
//! - [`Splitter::prepare`] fetches the source branch and checks out the
//!   `subtree__<branch>` working branch;
//! - [`Splitter::split`] extracts and pushes one library, and always removes
//!   the library branch and remote alias it created;
//! - [`Splitter::terminate`] checks the source branch out again and deletes
//!   the working branch.
//!
//! [`Splitter::stage`] wraps `prepare`/`terminate` in a guard.

use std::cell::Cell;
use std::rc::Rc;

use crossterm::style::Color;
use tracing::{debug, info, warn};

use crate::splitter::session::SessionCleanup;
use crate::splitter::{
    GitSubtreeAdapter, SplitAdapter, SplitLog, SplitSession, SplitshLiteAdapter, SplitterError,
    AUTO_ADAPTER,
};
use crate::utils::naming::subtree_branch_name;
use crate::utils::output::{Output, Verbosity};
use crate::utils::process::{Process, ProcessError};

/// Drives the split of libraries, one branch at a time.
pub struct Splitter {
    process: Process,
    output: Rc<dyn Output>,
    adapters: Vec<Box<dyn SplitAdapter>>,
    selected: Cell<Option<usize>>,
}

impl Splitter {
    /// Creates a splitter over the given adapters, in probe order.
    pub fn new(process: Process, output: Rc<dyn Output>, adapters: Vec<Box<dyn SplitAdapter>>) -> Self {
        Self {
            process,
            output,
            adapters,
            selected: Cell::new(None),
        }
    }

    /// Creates a splitter preferring `splitsh-lite` and falling back to `git subtree`.
    pub fn with_default_adapters(process: Process, output: Rc<dyn Output>) -> Self {
        let adapters: Vec<Box<dyn SplitAdapter>> = vec![
            Box::new(SplitshLiteAdapter::new(process.clone())),
            Box::new(GitSubtreeAdapter::new(process.clone())),
        ];
        Self::new(process, output, adapters)
    }

    /// Returns the registered adapter names, in probe order.
    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|adapter| adapter.name()).collect()
    }

    /// Pins an adapter by name, or goes back to automatic selection with
    /// `None` (or `"auto"`).
    ///
    /// The name is checked immediately: an unknown or unavailable adapter
    /// fails here, before any git command runs.
    pub fn set_adapter(&mut self, name: Option<&str>) -> Result<(), SplitterError> {
        let Some(name) = name.filter(|name| *name != AUTO_ADAPTER) else {
            self.selected.set(None);
            return Ok(());
        };

        let index = self
            .adapters
            .iter()
            .position(|adapter| adapter.name() == name)
            .ok_or_else(|| SplitterError::UnknownAdapter {
                name: name.to_string(),
                available: self.adapter_names().join(", "),
            })?;

        if !self.adapters[index].is_available() {
            return Err(SplitterError::AdapterUnavailable(name.to_string()));
        }

        info!(adapter = name, "Pinned splitter adapter");
        self.selected.set(Some(index));
        Ok(())
    }

    /// Returns the pinned adapter, or the first available one.
    ///
    /// The automatic choice is made once and kept for the rest of the run.
    pub fn adapter(&self) -> Result<&dyn SplitAdapter, SplitterError> {
        if let Some(index) = self.selected.get() {
            return Ok(self.adapters[index].as_ref());
        }

        let index = self
            .adapters
            .iter()
            .position(|adapter| adapter.is_available())
            .ok_or(SplitterError::NoAdapterAvailable)?;

        info!(adapter = self.adapters[index].name(), "Selected splitter adapter");
        self.selected.set(Some(index));
        Ok(self.adapters[index].as_ref())
    }

    /// Fetches `branch` from `remote` and checks out its working branch.
    pub fn prepare(&self, remote: &str, branch: &str) -> Result<(), SplitterError> {
        let remote_branch = format!("{remote}/{branch}");
        let subtree_branch = subtree_branch_name(branch);

        self.output.write(
            &format!(
                "[{}] Fetch from {}",
                self.output.paint(branch, Color::Green),
                self.output.paint(&remote_branch, Color::Yellow)
            ),
            Verbosity::Normal,
        );
        info!(%remote, %branch, "Fetching source branch");
        self.process.run_checked(&["git", "fetch", remote, branch])?;

        self.output.write(
            &format!(
                "[{}] Create subtree working branch {}",
                self.output.paint(branch, Color::Green),
                self.output.paint(&subtree_branch, Color::Yellow)
            ),
            Verbosity::Verbose,
        );
        self.process
            .run_checked(&["git", "checkout", "-B", &subtree_branch, &remote_branch])?;

        Ok(())
    }

    /// Checks `branch` out again and deletes its working branch.
    ///
    /// Both steps are best effort: the run goes on with the next branch.
    pub fn terminate(&self, remote: &str, branch: &str) {
        let remote_branch = format!("{remote}/{branch}");
        let subtree_branch = subtree_branch_name(branch);

        self.output.write(
            &format!(
                "[{}] Clean subtree working branch {}",
                self.output.paint(branch, Color::Green),
                self.output.paint(&subtree_branch, Color::Yellow)
            ),
            Verbosity::Verbose,
        );
        info!(%remote, %branch, "Restoring source branch");

        if !self
            .process
            .run(&["git", "checkout", "-B", branch, &remote_branch])
        {
            warn!(%branch, "Source branch could not be checked out again");
        }
        if !self.process.run(&["git", "branch", "-D", &subtree_branch]) {
            debug!(branch = %subtree_branch, "Working branch was not deleted");
        }
    }

    /// Prepares `branch` and returns a guard that terminates it when finished
    /// or dropped.
    pub fn stage<'a>(&'a self, remote: &str, branch: &str) -> Result<StagedBranch<'a>, SplitterError> {
        self.prepare(remote, branch)?;
        Ok(StagedBranch {
            splitter: self,
            remote: remote.to_string(),
            branch: branch.to_string(),
            finished: false,
        })
    }

    /// Splits one library of a prepared branch and pushes it to `library_url`.
    ///
    /// Never fails: the outcome is reported through the output and returned
    /// as a boolean so one library cannot abort the run.
    pub fn split(&self, branch: &str, library_path: &str, library_url: &str, allow_scratch: bool) -> bool {
        let session = SplitSession::new(branch, library_path);

        self.output.overwrite(
            &format!("{} Library splitting in progress...", self.status_prefix(branch, library_path)),
            self.output.is_very_verbose(),
            Verbosity::Normal,
        );

        let result = {
            let _cleanup = SessionCleanup::new(&self.process, self, &session);
            self.split_session(&session, library_url, allow_scratch)
        };

        match result {
            Ok(()) => {
                info!(%branch, %library_path, "Library split");
                self.output.overwrite(
                    &format!("{} Library splitting success", self.status_prefix(branch, library_path)),
                    true,
                    Verbosity::Normal,
                );
                true
            }
            Err(err) => {
                warn!(%branch, %library_path, "Library split failed: {err}");
                self.output.overwrite_error(
                    &format!(
                        "{} {}",
                        self.status_prefix(branch, library_path),
                        self.output
                            .paint(&format!("Library splitting error: {err}"), Color::Red)
                    ),
                    true,
                    Verbosity::Normal,
                );
                false
            }
        }
    }

    fn split_session(
        &self,
        session: &SplitSession,
        library_url: &str,
        allow_scratch: bool,
    ) -> Result<(), SplitterError> {
        let branch = session.branch.as_str();
        let path = session.library_path.as_str();

        // An alias left over by an interrupted run already points at the library.
        self.log_split(branch, path, "Adding the remote repository of the library...", Verbosity::Normal);
        if !self
            .process
            .run(&["git", "remote", "add", &session.remote_alias, library_url])
        {
            debug!(remote = %session.remote_alias, "Remote alias was not added");
        }

        let scratched = self.adapter()?.split(self, session, allow_scratch)?;

        self.log_split(branch, path, "Pushing to the remote repository...", Verbosity::Normal);
        if let Err(err) = self.push(session, scratched) {
            if !allow_scratch || scratched {
                return Err(err.into());
            }

            info!(%branch, library_path = %path, "Push rejected ({err}), forcing");
            self.log_split(branch, path, "Force pushing to the remote repository...", Verbosity::Normal);
            self.push(session, true)?;
        }

        Ok(())
    }

    fn push(&self, session: &SplitSession, force: bool) -> Result<(), ProcessError> {
        let refspec = format!("{}:{}", session.library_branch, session.branch);
        let mut command = vec![
            "git",
            "push",
            "--follow-tags",
            "--tags",
            session.remote_alias.as_str(),
            refspec.as_str(),
        ];
        if force {
            command.push("--force");
        }

        self.process.run_checked(&command)
    }

    fn status_prefix(&self, branch: &str, library_path: &str) -> String {
        format!(
            "[{}][{}]",
            self.output.paint(branch, Color::Green),
            self.output.paint(library_path, Color::Green)
        )
    }
}

impl SplitLog for Splitter {
    fn log_split(&self, branch: &str, library_path: &str, message: &str, verbosity: Verbosity) {
        self.output.overwrite(
            &format!(
                "{} Library splitting in progress: {message}",
                self.status_prefix(branch, library_path)
            ),
            self.output.is_very_verbose(),
            verbosity,
        );
    }
}


/// A branch prepared for splitting.
///
/// Terminates the branch when [`finish`](Self::finish) is called or when the
/// guard goes out of scope.
pub struct StagedBranch<'a> {
    splitter: &'a Splitter,
    remote: String,
    branch: String,
    finished: bool,
}

impl StagedBranch<'_> {
    /// Returns the staged source branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Splits one library of this branch; see [`Splitter::split`].
    pub fn split(&self, library_path: &str, library_url: &str, allow_scratch: bool) -> bool {
        self.splitter
            .split(&self.branch, library_path, library_url, allow_scratch)
    }

    /// Restores the source branch now.
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.finished {
            self.finished = true;
            self.splitter.terminate(&self.remote, &self.branch);
        }
    }
}

impl Drop for StagedBranch<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
