//! Static checks of a configuration file.

use std::path::Path;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::config::source::read_object;
use crate::splitter::{GitSubtreeAdapter, SplitshLiteAdapter, AUTO_ADAPTER};

const GIT_URL_PATTERN: &str = r"^([A-Za-z0-9]+@|https?://)([A-Za-z0-9.]+(:\d+)?)(?::|/)([/\w.-]+?)(\.git)?$";

/// Checks configuration files without loading them.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// The expected shape of a top level key.
#[derive(Clone, Copy)]
enum Kind {
    String,
    StringList,
    StringMap,
    Seconds,
}

fn kind_of(key: &str) -> Option<Kind> {
    match key {
        "home" | "data-dir" | "adapter" | "branch-pattern" => Some(Kind::String),
        "branches" => Some(Kind::StringList),
        "libraries" | "binaries" => Some(Kind::StringMap),
        "timeout" | "probe-timeout" => Some(Kind::Seconds),
        _ => None,
    }
}

impl ConfigValidator {
    /// Creates a validator.
    pub fn new() -> Self {
        Self
    }

    /// Whether `key` is a top level key the configuration understands.
    pub fn is_known_key(key: &str) -> bool {
        kind_of(key).is_some()
    }

    /// Validates the file at `path`.
    ///
    /// Returns `(errors, warnings)`. Errors make the file unusable; warnings
    /// point at values that will most likely fail at split time.
    pub fn validate(&self, path: &Path) -> (Vec<String>, Vec<String>) {
        let config = match read_object(path) {
            Ok(Some(config)) => config,
            Ok(None) => return (vec![format!("The file \"{}\" does not exist", path.display())], Vec::new()),
            Err(e) => return (vec![error_chain(&e)], Vec::new()),
        };

        self.validate_map(&config)
    }

    /// Validates an already parsed configuration object.
    pub fn validate_map(&self, config: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (key, value) in config {
            let Some(kind) = kind_of(key) else {
                errors.push(format!("The property \"{key}\" is not defined"));
                continue;
            };
            if let Some(message) = check_kind(key, value, kind) {
                errors.push(message);
            }
        }

        if let Some(Value::String(pattern)) = config.get("branch-pattern") {
            if let Err(e) = Regex::new(pattern) {
                errors.push(format!("The \"branch-pattern\" value is not a valid regex: {e}"));
            }
        }

        if let Some(Value::String(adapter)) = config.get("adapter") {
            if ![AUTO_ADAPTER, SplitshLiteAdapter::NAME, GitSubtreeAdapter::NAME].contains(&adapter.as_str()) {
                warnings.push(format!("The \"adapter\" value \"{adapter}\" is not a known splitter adapter"));
            }
        }

        if let Some(Value::Object(libraries)) = config.get("libraries") {
            for (path, url) in libraries {
                let valid = url.as_str().is_some_and(|url| git_url_regex().is_match(url));
                if !valid {
                    warnings.push(format!(
                        "The \"libraries[{path}]\" value must contain a valid URL of GIT repository"
                    ));
                }
            }
        }

        (errors, warnings)
    }
}

fn check_kind(key: &str, value: &Value, kind: Kind) -> Option<String> {
    let valid = match kind {
        Kind::String => value.is_string(),
        Kind::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        Kind::StringMap => value
            .as_object()
            .is_some_and(|map| map.values().all(Value::is_string)),
        Kind::Seconds => value.is_u64(),
    };
    if valid {
        return None;
    }

    let expected = match kind {
        Kind::String => "a string",
        Kind::StringList => "an array of strings",
        Kind::StringMap => "an object of strings",
        Kind::Seconds => "a positive integer",
    };
    Some(format!("The property \"{key}\" must be {expected}"))
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[allow(clippy::expect_used)]
fn git_url_regex() -> &'static Regex {
    static GIT_URL: OnceLock<Regex> = OnceLock::new();
    GIT_URL.get_or_init(|| {
        RegexBuilder::new(GIT_URL_PATTERN)
            .case_insensitive(true)
            .build()
            .expect("git url pattern is valid")
    })
}
