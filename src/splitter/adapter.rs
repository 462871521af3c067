//! Contract shared by the history extraction engines.

use crate::splitter::SplitSession;
use crate::utils::output::Verbosity;
use crate::utils::process::ProcessError;

/// Receives per-library progress messages.
pub trait SplitLog {
    /// Reports progress for one library of one branch.
    fn log_split(&self, branch: &str, library_path: &str, message: &str, verbosity: Verbosity);
}

/// Extracts the history of one library path into the session's library branch.
///
/// Adapters hold no state between calls. The splitter picks exactly one per run.
pub trait SplitAdapter {
    /// Name used to pin the adapter in the configuration.
    fn name(&self) -> &'static str;

    /// Probes the environment for the engine.
    fn is_available(&self) -> bool;

    /// Creates `session.library_branch` from the current working branch.
    ///
    /// When the first attempt fails and `allow_scratch` is set, the adapter
    /// discards its previous state and tries once more; it then returns
    /// `Ok(true)` ("scratched"). A failure of that second attempt is returned
    /// as an error.
    fn split(
        &self,
        log: &dyn SplitLog,
        session: &SplitSession,
        allow_scratch: bool,
    ) -> Result<bool, ProcessError>;
}

/// Runs `attempt` once, then once more in scratch mode if allowed.
///
/// Returns whether the scratch attempt was needed.
pub(crate) fn split_with_scratch<F>(allow_scratch: bool, attempt: F) -> Result<bool, ProcessError>
where
    F: Fn(bool) -> Result<(), ProcessError>,
{
    match attempt(false) {
        Ok(()) => Ok(false),
        Err(err) if allow_scratch => {
            tracing::info!("Split failed ({err}), retrying from scratch");
            attempt(true)?;
            Ok(true)
        }
        Err(err) => Err(err),
    }
}
