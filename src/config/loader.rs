//! Locating and merging the configuration layers.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::source::read_object;
use crate::config::{ConfigError, ConfigTree, Settings, CONFIG_ENV, DEFAULT_CONFIG_FILE, HOME_ENV};
use crate::utils::naming::repository_key;

/// Where the configuration files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Home directory holding `config.json` and, by default, `configs/`.
    pub home: PathBuf,
    /// Project configuration file.
    pub project_file: PathBuf,
}

impl ConfigPaths {
    /// Creates the paths from explicit locations.
    pub fn new<H: Into<PathBuf>, P: Into<PathBuf>>(home: H, project_file: P) -> Self {
        Self {
            home: home.into(),
            project_file: project_file.into(),
        }
    }

    /// Resolves the paths from the environment.
    ///
    /// The home is `$SUBSPLIT_HOME`, else `~/.subsplit`. The project file is
    /// `config`, else `$SUBSPLIT_CONFIG`, else `.subsplit.json`; a relative
    /// project file is taken from `base_dir`.
    pub fn resolve(base_dir: &Path, config: Option<&Path>) -> Result<Self, ConfigError> {
        let home = match non_empty_var(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => dirs::home_dir().ok_or(ConfigError::NoHome)?.join(".subsplit"),
        };

        let project_file = config
            .map(Path::to_path_buf)
            .or_else(|| non_empty_var(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Ok(Self::new(home, base_dir.join(project_file)))
    }

    /// Returns the global configuration file.
    pub fn global_file(&self) -> PathBuf {
        self.home.join("config.json")
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The merged configuration of a run.
///
/// Loading only merges JSON objects; value types are checked when the
/// typed [`Settings`] are requested, so a file with a wrong value can still
/// be loaded and edited.
#[derive(Debug, Clone)]
pub struct Config {
    tree: ConfigTree,
    paths: ConfigPaths,
    repository_file: Option<PathBuf>,
    loaded_files: Vec<PathBuf>,
}

impl Config {
    /// Loads every layer: defaults, global file, repository file and project
    /// file.
    ///
    /// `repository_url` is the URL of the repository's first remote; without
    /// it the repository layer is skipped. Missing files are skipped.
    pub fn load(paths: ConfigPaths, repository_url: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_layers(paths, repository_url, true)
    }

    /// Loads every layer except the project file.
    pub fn load_global(paths: ConfigPaths, repository_url: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_layers(paths, repository_url, false)
    }

    fn load_layers(
        paths: ConfigPaths,
        repository_url: Option<&str>,
        with_project: bool,
    ) -> Result<Self, ConfigError> {
        let mut tree = ConfigTree::defaults(&paths.home);
        let mut loaded_files = Vec::new();

        merge_file(&mut tree, &paths.global_file(), &mut loaded_files)?;

        let repository_file = repository_url.map(|url| repository_file(&tree, &paths, url));
        if let Some(file) = &repository_file {
            merge_file(&mut tree, file, &mut loaded_files)?;
        }

        if with_project {
            merge_file(&mut tree, &paths.project_file, &mut loaded_files)?;
        }

        Ok(Self {
            tree,
            paths,
            repository_file,
            loaded_files,
        })
    }

    /// Returns the merged tree.
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Returns the typed settings of the merged tree.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Settings::from_map(self.tree.raw())
    }

    /// Returns the file locations.
    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Returns the per-repository file, when the repository has a remote.
    pub fn repository_file(&self) -> Option<&Path> {
        self.repository_file.as_deref()
    }

    /// Returns the files that were found and merged, in merge order.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    /// Whether the project file was found and merged.
    pub fn has_project_file(&self) -> bool {
        self.loaded_files.contains(&self.paths.project_file)
    }
}

/// Returns `<data-dir>/<repository key>.json`.
fn repository_file(tree: &ConfigTree, paths: &ConfigPaths, url: &str) -> PathBuf {
    let data_dir = tree
        .get_str("data-dir")
        .map_or_else(|| paths.home.join("configs"), PathBuf::from);
    data_dir.join(format!("{}.json", repository_key(url)))
}

fn merge_file(tree: &mut ConfigTree, path: &Path, loaded: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
    match read_object(path)? {
        Some(layer) => {
            debug!(path = %path.display(), "Loading config file");
            tree.merge(layer);
            loaded.push(path.to_path_buf());
        }
        None => debug!(path = %path.display(), "Config file not found"),
    }
    Ok(())
}
