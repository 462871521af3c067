//! Utility functions and helpers.

pub mod naming;
pub mod output;
pub mod process;

pub use naming::{is_splittable, library_branch_name, remote_alias, subtree_branch_name};
pub use output::{ConsoleOutput, NullOutput, Output, Verbosity};
pub use process::{Process, ProcessError};
