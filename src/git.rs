//! Git queries used to decide what to split.

pub mod changes;
pub mod repository;
pub mod version;

pub use changes::{affected_libraries, modified_files};
pub use repository::GitRepository;
pub use version::{GitVersion, MINIMUM_VERSION};
