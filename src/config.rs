//! Layered JSON configuration.
//!
//! Four layers are merged, later ones winning: built-in defaults, the global
//! `config.json` in the home directory, the per-repository file in the data
//! directory and the project file (`.subsplit.json` by default).

pub mod loader;
pub mod settings;
pub mod source;
pub mod tree;
pub mod validator;

pub use loader::{Config, ConfigPaths};
pub use settings::Settings;
pub use source::JsonConfigSource;
pub use tree::ConfigTree;
pub use validator::ConfigValidator;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "SUBSPLIT_HOME";

/// Environment variable naming the project configuration file.
pub const CONFIG_ENV: &str = "SUBSPLIT_CONFIG";

/// Project configuration file used when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".subsplit.json";

/// Errors raised while reading or writing configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `$SUBSPLIT_HOME` nor the user's home directory is known.
    #[error("The HOME or {HOME_ENV} environment variable must be set")]
    NoHome,

    /// The file exists but could not be read.
    #[error("The file \"{}\" is not readable", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file could not be written.
    #[error("The file \"{}\" is not writable", path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON.
    #[error("\"{}\" does not contain valid JSON", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The file is valid JSON but not an object.
    #[error("\"{}\" must contain a JSON object", path.display())]
    NotAnObject {
        /// File path.
        path: PathBuf,
    },

    /// A known key holds a value of the wrong type.
    #[error("Invalid configuration")]
    Invalid(#[source] serde_json::Error),
}
