//! Editing a single configuration file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ConfigError;

/// Reads a configuration file, `None` when it does not exist.
pub(crate) fn read_object(path: &Path) -> Result<Option<Map<String, Value>>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(Some(Map::new()));
    }

    match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// A JSON configuration file edited in place.
///
/// Every operation reads the file, changes one key and writes it back as
/// pretty JSON. A missing file reads as `{}` and is only created once it
/// has something to hold.
#[derive(Debug, Clone)]
pub struct JsonConfigSource {
    path: PathBuf,
}

impl JsonConfigSource {
    /// Creates a source for `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file content, `{}` when missing.
    pub fn read(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(read_object(&self.path)?.unwrap_or_default())
    }

    /// Sets a top level key.
    pub fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        self.edit(|config| {
            config.insert(key.to_string(), value);
        })
    }

    /// Removes a top level key.
    pub fn unset(&self, key: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            config.remove(key);
        })
    }

    /// Appends a branch unless already listed.
    pub fn add_branch(&self, branch: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            let branches = array_entry(config, "branches");
            if !branches.iter().any(|item| item.as_str() == Some(branch)) {
                branches.push(Value::String(branch.to_string()));
            }
        })
    }

    /// Removes a branch from the list.
    pub fn remove_branch(&self, branch: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            if let Some(Value::Array(branches)) = config.get_mut("branches") {
                branches.retain(|item| item.as_str() != Some(branch));
            }
        })
    }

    /// Adds or replaces a library.
    pub fn add_library(&self, path: &str, url: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            object_entry(config, "libraries").insert(path.to_string(), Value::String(url.to_string()));
        })
    }

    /// Removes a library.
    pub fn remove_library(&self, path: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            if let Some(Value::Object(libraries)) = config.get_mut("libraries") {
                libraries.remove(path);
            }
        })
    }

    /// Adds or replaces a custom binary.
    pub fn add_binary(&self, name: &str, path: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            object_entry(config, "binaries").insert(name.to_string(), Value::String(path.to_string()));
        })
    }

    /// Removes a custom binary.
    pub fn remove_binary(&self, name: &str) -> Result<(), ConfigError> {
        self.edit(|config| {
            if let Some(Value::Object(binaries)) = config.get_mut("binaries") {
                binaries.remove(name);
            }
        })
    }

    fn edit<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let existing = read_object(&self.path)?;
        let exists = existing.is_some();
        let mut config = existing.unwrap_or_default();
        change(&mut config);

        if config.is_empty() && !exists {
            debug!(path = %self.path.display(), "Nothing to write");
            return Ok(());
        }
        self.write(&config)
    }

    fn write(&self, config: &Map<String, Value>) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut content = serde_json::to_string_pretty(config).map_err(ConfigError::Invalid)?;
        content.push('\n');
        fs::write(&self.path, content).map_err(write_error)?;

        debug!(path = %self.path.display(), "Config file written");
        Ok(())
    }
}

fn array_entry<'a>(config: &'a mut Map<String, Value>, key: &str) -> &'a mut Vec<Value> {
    let entry = config
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    match entry {
        Value::Array(items) => items,
        _ => unreachable!("entry was just made an array"),
    }
}

fn object_entry<'a>(config: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = config
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(map) => map,
        _ => unreachable!("entry was just made an object"),
    }
}
