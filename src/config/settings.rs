//! Typed view of the merged configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ConfigError;
use crate::utils::process::{Timeouts, DEFAULT_PROBE_TIMEOUT};

/// Settings read by the split command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Pinned splitter adapter, `auto` or absent for automatic selection.
    pub adapter: Option<String>,

    /// Regex selecting the remote branches split by `--all`.
    pub branch_pattern: Option<String>,

    /// Branches split when none is given on the command line.
    pub branches: Vec<String>,

    /// Library directory to git URL of its repository.
    pub libraries: BTreeMap<String, String>,

    /// Program name to path of the binary to run instead.
    pub binaries: BTreeMap<String, String>,

    /// Timeout of git and engine commands in seconds, `0` for none.
    pub timeout: Option<u64>,

    /// Timeout of availability probes in seconds.
    pub probe_timeout: Option<u64>,
}

impl Settings {
    /// Builds the typed view, ignoring keys it does not know.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ConfigError> {
        serde_json::from_value(Value::Object(map.clone())).map_err(ConfigError::Invalid)
    }

    /// Returns the process timeouts described by these settings.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            command: self
                .timeout
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
            probe: self
                .probe_timeout
                .filter(|seconds| *seconds > 0)
                .map_or(DEFAULT_PROBE_TIMEOUT, Duration::from_secs),
        }
    }

    /// Returns the branches to split by default, without duplicates.
    pub fn default_branches(&self) -> Vec<String> {
        let mut branches: Vec<String> = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            if !branches.contains(branch) {
                branches.push(branch.clone());
            }
        }
        branches
    }
}
