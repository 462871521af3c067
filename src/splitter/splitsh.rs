//! Adapter built on the `splitsh-lite` binary.

use crate::splitter::adapter::split_with_scratch;
use crate::splitter::{SplitAdapter, SplitLog, SplitSession};
use crate::utils::output::Verbosity;
use crate::utils::process::{Process, ProcessError};

/// Splits with `splitsh-lite`, much faster than `git subtree` on large histories.
#[derive(Clone)]
pub struct SplitshLiteAdapter {
    process: Process,
}

impl SplitshLiteAdapter {
    /// Name used to pin this adapter.
    pub const NAME: &'static str = "splitsh-lite";

    /// Creates the adapter.
    pub fn new(process: Process) -> Self {
        Self { process }
    }

    fn subtree(&self, session: &SplitSession, scratch: bool) -> Result<(), ProcessError> {
        let prefix = format!("--prefix={}", session.library_path);
        let origin = format!("--origin=heads/{}", session.subtree_branch);
        let target = format!("--target=heads/{}", session.library_branch);

        let mut command = vec![
            Self::NAME,
            prefix.as_str(),
            origin.as_str(),
            target.as_str(),
            "--quiet",
        ];
        if scratch {
            command.push("--scratch");
        }
        self.process.run_checked(&command)?;

        // splitsh-lite exits successfully on an empty prefix without writing the target.
        let library_ref = format!("refs/heads/{}", session.library_branch);
        self.process
            .run_checked(&["git", "rev-parse", "--verify", "--quiet", &library_ref])
    }
}

impl SplitAdapter for SplitshLiteAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        self.process
            .probe()
            .run_single_result(&[Self::NAME, "--version"])
            .is_some()
    }

    fn split(
        &self,
        log: &dyn SplitLog,
        session: &SplitSession,
        allow_scratch: bool,
    ) -> Result<bool, ProcessError> {
        log.log_split(
            &session.branch,
            &session.library_path,
            "Splitting local branch...",
            Verbosity::Normal,
        );
        split_with_scratch(allow_scratch, |scratch| self.subtree(session, scratch))
    }
}
