//! Adapter built on `git subtree split`.

use tracing::debug;

use crate::splitter::adapter::split_with_scratch;
use crate::splitter::{SplitAdapter, SplitLog, SplitSession};
use crate::utils::output::Verbosity;
use crate::utils::process::{Process, ProcessError};

/// Splits with the `git subtree` command shipped with git.
#[derive(Clone)]
pub struct GitSubtreeAdapter {
    process: Process,
}

impl GitSubtreeAdapter {
    /// Name used to pin this adapter.
    pub const NAME: &'static str = "git-subtree";

    /// Creates the adapter.
    pub fn new(process: Process) -> Self {
        Self { process }
    }

    fn subtree(&self, session: &SplitSession, scratch: bool) -> Result<(), ProcessError> {
        if scratch {
            self.process
                .run(&["git", "branch", "-D", &session.library_branch]);
        }

        self.process.run_checked(&[
            "git",
            "subtree",
            "split",
            "-P",
            &session.library_path,
            "-b",
            &session.library_branch,
        ])
    }
}

impl SplitAdapter for GitSubtreeAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_available(&self) -> bool {
        true
    }

    fn split(
        &self,
        log: &dyn SplitLog,
        session: &SplitSession,
        allow_scratch: bool,
    ) -> Result<bool, ProcessError> {
        let branch = session.branch.as_str();
        let path = session.library_path.as_str();

        // The library remote may still be empty; both steps are allowed to fail.
        log.log_split(branch, path, "Fetching remote repository...", Verbosity::Normal);
        if !self
            .process
            .run(&["git", "fetch", &session.remote_alias, "--depth=1"])
        {
            debug!(remote = %session.remote_alias, "Library remote could not be fetched");
        }

        log.log_split(branch, path, "Creating the local branch...", Verbosity::Normal);
        if !self.process.run(&[
            "git",
            "branch",
            &session.library_branch,
            &session.remote_branch(),
        ]) {
            debug!(branch = %session.remote_branch(), "Library has no existing branch");
        }

        log.log_split(branch, path, "Splitting the local branch...", Verbosity::Normal);
        split_with_scratch(allow_scratch, |scratch| self.subtree(session, scratch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::test_utils::{NoopLog, ScriptedRunner};

    fn adapter(runner: &ScriptedRunner) -> GitSubtreeAdapter {
        GitSubtreeAdapter::new(runner.process())
    }

    #[test]
    fn is_always_available() {
        let runner = ScriptedRunner::new();
        assert!(adapter(&runner).is_available());
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn splits_into_the_library_branch() {
        let runner = ScriptedRunner::new()
            .fail("git fetch target-src-liba")
            .fail("git branch subtree__main__src-liba target-src-liba/main");
        let session = SplitSession::new("main", "src/LibA");

        let scratched = adapter(&runner).split(&NoopLog, &session, true).unwrap();

        assert!(!scratched);
        assert_eq!(
            runner.commands(),
            vec![
                "git fetch target-src-liba --depth=1",
                "git branch subtree__main__src-liba target-src-liba/main",
                "git subtree split -P src/LibA -b subtree__main__src-liba",
            ]
        );
    }

    #[test]
    fn scratches_the_library_branch_after_a_failed_split() {
        let runner = ScriptedRunner::new().fail_times("git subtree split", 1);
        let session = SplitSession::new("main", "src/LibA");

        let scratched = adapter(&runner).split(&NoopLog, &session, true).unwrap();

        assert!(scratched);
        assert_eq!(
            &runner.commands()[2..],
            [
                "git subtree split -P src/LibA -b subtree__main__src-liba",
                "git branch -D subtree__main__src-liba",
                "git subtree split -P src/LibA -b subtree__main__src-liba",
            ]
        );
    }

    #[test]
    fn failure_without_scratch_propagates() {
        let runner = ScriptedRunner::new().fail("git subtree split");
        let session = SplitSession::new("main", "src/LibA");

        assert!(adapter(&runner).split(&NoopLog, &session, false).is_err());
        assert_eq!(runner.count("git subtree split"), 1);
    }

    #[test]
    fn second_failure_propagates() {
        let runner = ScriptedRunner::new().fail("git subtree split");
        let session = SplitSession::new("main", "src/LibA");

        assert!(adapter(&runner).split(&NoopLog, &session, true).is_err());
        assert_eq!(runner.count("git subtree split"), 2);
    }
}
