//! Split orchestration: staging a branch, extracting library history with a
//! pluggable engine, pushing it and cleaning up after every library.

pub mod adapter;
pub mod orchestrator;
pub mod session;
pub mod splitsh;
pub mod subtree;

#[cfg(test)]
pub(crate) mod test_utils;

pub use adapter::{SplitAdapter, SplitLog};
pub use orchestrator::{StagedBranch, Splitter};
pub use session::SplitSession;
pub use splitsh::SplitshLiteAdapter;
pub use subtree::GitSubtreeAdapter;

use thiserror::Error;

use crate::utils::process::ProcessError;

/// Adapter name meaning "pick the first available adapter".
pub const AUTO_ADAPTER: &str = "auto";

/// Errors raised by the splitter.
#[derive(Debug, Error)]
pub enum SplitterError {
    /// The pinned adapter name is not registered.
    #[error("The \"{name}\" splitter adapter does not exist, available adapters: {available}")]
    UnknownAdapter {
        /// Requested name.
        name: String,
        /// Comma separated registered names.
        available: String,
    },

    /// The pinned adapter is registered but its engine is not installed.
    #[error("The \"{0}\" splitter adapter is not available on this system")]
    AdapterUnavailable(String),

    /// No registered adapter is available.
    #[error("No adapter for splitter is found")]
    NoAdapterAvailable,

    /// A git or engine command failed.
    #[error(transparent)]
    Process(#[from] ProcessError),
}
