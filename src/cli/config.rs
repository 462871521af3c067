//! Config command: reads and edits the configuration files.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Number, Value};

use crate::cli::{repository_url, GlobalArgs};
use crate::config::{Config, ConfigTree, ConfigValidator, JsonConfigSource};
use crate::utils::output::{Output, Verbosity};

/// Keys edited with `set` and `unset`; collections have their own subcommands.
const SCALAR_KEYS: &[&str] = &[
    "home",
    "data-dir",
    "adapter",
    "branch-pattern",
    "timeout",
    "probe-timeout",
];

/// Configuration operations.
///
/// Edits the project file by default, the global `config.json` with
/// `--global` or the file of the current repository with `--global-repo`.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Apply the command to the global config file.
    #[arg(short = 'G', long, conflicts_with_all = ["global_repo", "config"])]
    pub global: bool,

    /// Apply the command to the global config file of the current repository.
    #[arg(short = 'g', long, conflicts_with_all = ["global", "config"])]
    pub global_repo: bool,

    /// Config subcommand to execute; lists the configuration when omitted.
    #[command(subcommand)]
    pub command: Option<ConfigSubcommands>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Lists the configuration settings.
    List,
    /// Shows the value of a setting.
    Get {
        /// Dot separated key, e.g. `libraries.src/LibA`.
        key: String,
    },
    /// Sets a setting.
    Set {
        /// Setting key.
        key: String,
        /// New value; `true`, `false` and integers are stored as JSON scalars.
        value: String,
    },
    /// Removes a setting.
    Unset {
        /// Setting key.
        key: String,
    },
    /// Manages the default branches.
    #[command(subcommand)]
    Branch(BranchSubcommands),
    /// Manages the libraries.
    #[command(subcommand)]
    Library(LibrarySubcommands),
    /// Manages the custom binaries.
    #[command(subcommand)]
    Binary(BinarySubcommands),
}

/// Branch subcommands.
#[derive(Subcommand)]
pub enum BranchSubcommands {
    /// Adds a branch split by default.
    Add {
        /// Branch name.
        name: String,
    },
    /// Removes a branch.
    Remove {
        /// Branch name.
        name: String,
    },
}

/// Library subcommands.
#[derive(Subcommand)]
pub enum LibrarySubcommands {
    /// Adds or replaces a library.
    Add {
        /// Library directory in the monorepo.
        path: String,
        /// Git URL of the library repository.
        url: String,
    },
    /// Removes a library.
    Remove {
        /// Library directory in the monorepo.
        path: String,
    },
}

/// Binary subcommands.
#[derive(Subcommand)]
pub enum BinarySubcommands {
    /// Runs a custom binary instead of a default one.
    Add {
        /// Default binary name, e.g. `git`.
        name: String,
        /// Path of the custom binary.
        path: String,
    },
    /// Goes back to the default binary.
    Remove {
        /// Default binary name.
        name: String,
    },
}

/// The file a config command works on.
enum Target {
    Project(Config),
    File(JsonConfigSource),
}

impl ConfigCommand {
    /// Executes the config command.
    pub fn execute(self, global: &GlobalArgs) -> Result<i32> {
        // A `--config` placed before the subcommand is only seen by the parent parser.
        if (self.global || self.global_repo) && global.config.is_some() {
            bail!("The \"--config\" option cannot be used with \"--global\" or \"--global-repo\"");
        }

        let base_dir = global.base_dir()?;
        let paths = global.config_paths(&base_dir)?;
        let url = repository_url(&base_dir);

        let target = if self.global {
            Target::File(JsonConfigSource::new(paths.global_file()))
        } else if self.global_repo {
            let config = Config::load_global(paths, url.as_deref())?;
            let file = config
                .repository_file()
                .ok_or_else(|| anyhow!("The working directory is not a git repository with a remote"))?;
            Target::File(JsonConfigSource::new(file))
        } else {
            Target::Project(Config::load(paths, url.as_deref())?)
        };

        let output = global.output();
        run(self.command.unwrap_or(ConfigSubcommands::List), &target, output.as_ref())?;
        Ok(0)
    }
}

impl Target {
    fn tree(&self) -> Result<ConfigTree> {
        match self {
            Self::Project(config) => Ok(config.tree().clone()),
            Self::File(source) => Ok(ConfigTree::from(source.read()?)),
        }
    }

    fn source(&self) -> JsonConfigSource {
        match self {
            Self::Project(config) => JsonConfigSource::new(config.paths().project_file.clone()),
            Self::File(source) => source.clone(),
        }
    }

    fn path(&self) -> PathBuf {
        self.source().path().to_path_buf()
    }
}

fn run(command: ConfigSubcommands, target: &Target, output: &dyn Output) -> Result<()> {
    match command {
        ConfigSubcommands::List => {
            let tree = target.tree()?;
            let mut lines = Vec::new();
            list_lines(&tree, &[], &Value::Object(tree.raw().clone()), &mut lines);
            for line in lines {
                output.write(&line, Verbosity::Quiet);
            }
        }
        ConfigSubcommands::Get { key } => {
            let value = target
                .tree()?
                .get(&key)
                .ok_or_else(|| anyhow!("The \"{key}\" setting key is not set"))?;
            match &value {
                Value::Object(map) if !map.is_empty() => {
                    for (name, item) in map {
                        output.write(&format!("[{name}] {}", format_value(item)), Verbosity::Quiet);
                    }
                }
                Value::Array(items) if !items.is_empty() => {
                    for (index, item) in items.iter().enumerate() {
                        output.write(&format!("[{index}] {}", format_value(item)), Verbosity::Quiet);
                    }
                }
                other => output.write(&format_value(other), Verbosity::Quiet),
            }
        }
        ConfigSubcommands::Set { key, value } => {
            check_scalar_key(&key)?;
            let value = parse_value(&value);
            let mut single = Map::new();
            single.insert(key.clone(), value.clone());
            let (errors, _) = ConfigValidator::new().validate_map(&single);
            if let Some(error) = errors.into_iter().next() {
                bail!(error);
            }
            target.source().set(&key, value)?;
        }
        ConfigSubcommands::Unset { key } => {
            if !ConfigValidator::is_known_key(&key) {
                bail!("The \"{key}\" setting key does not exist");
            }
            target.source().unset(&key)?;
        }
        ConfigSubcommands::Branch(BranchSubcommands::Add { name }) => target.source().add_branch(&name)?,
        ConfigSubcommands::Branch(BranchSubcommands::Remove { name }) => {
            target.source().remove_branch(&name)?;
        }
        ConfigSubcommands::Library(LibrarySubcommands::Add { path, url }) => {
            target.source().add_library(&path, &url)?;
        }
        ConfigSubcommands::Library(LibrarySubcommands::Remove { path }) => {
            target.source().remove_library(&path)?;
        }
        ConfigSubcommands::Binary(BinarySubcommands::Add { name, path }) => {
            target.source().add_binary(&name, &path)?;
        }
        ConfigSubcommands::Binary(BinarySubcommands::Remove { name }) => {
            target.source().remove_binary(&name)?;
        }
    }

    tracing::debug!(path = %target.path().display(), "Config command done");
    Ok(())
}

fn check_scalar_key(key: &str) -> Result<()> {
    match key {
        "branches" | "branch" => bail!("Use \"config branch add|remove\" to edit the branches"),
        "libraries" | "library" => bail!("Use \"config library add|remove\" to edit the libraries"),
        "binaries" | "binary" => bail!("Use \"config binary add|remove\" to edit the binaries"),
        key if SCALAR_KEYS.contains(&key) => Ok(()),
        key => bail!("The \"{key}\" setting key does not exist"),
    }
}

/// Parses a command line value into a JSON scalar.
fn parse_value(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => value
            .parse::<u64>()
            .map(Number::from)
            .or_else(|_| value.parse::<i64>().map(Number::from))
            .map_or_else(|_| Value::String(value.to_string()), Value::Number),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Renders one `[a].[b] value` line per leaf, expanding placeholders.
fn list_lines(tree: &ConfigTree, prefix: &[String], value: &Value, lines: &mut Vec<String>) {
    let label = |keys: &[String]| {
        keys.iter()
            .map(|key| format!("[{key}]"))
            .collect::<Vec<_>>()
            .join(".")
    };

    let children: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(key, item)| (key.clone(), item)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        leaf => {
            let resolved = tree.get(&prefix.join(".")).unwrap_or_else(|| leaf.clone());
            lines.push(format!("{} {}", label(prefix), format_value(&resolved)));
            return;
        }
    };

    if children.is_empty() && !prefix.is_empty() {
        lines.push(format!("{} []", label(prefix)));
    }
    for (key, item) in children {
        let mut path = prefix.to_vec();
        path.push(key);
        list_lines(tree, &path, item, lines);
    }
}
