//! The merged configuration tree.

use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

/// Nested placeholders deeper than this are left unexpanded.
const MAX_EXPANSION_DEPTH: usize = 8;

/// A JSON object built by merging configuration layers.
///
/// Objects merge key by key, arrays are appended to, anything else is
/// replaced by the later layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the tree of built-in defaults for the given home directory.
    pub fn defaults(home: &Path) -> Self {
        let mut root = Map::new();
        root.insert("home".to_string(), Value::String(home.display().to_string()));
        root.insert("data-dir".to_string(), Value::String("{home}/configs".to_string()));
        Self { root }
    }

    /// Merges a layer on top of this tree.
    pub fn merge(&mut self, layer: Map<String, Value>) {
        merge_objects(&mut self.root, layer);
    }

    /// Returns the raw merged object, placeholders untouched.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Looks up a dot separated key.
    ///
    /// Numeric segments index into arrays. A string result has its `{key}`
    /// placeholders replaced by the values of those keys.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at_depth(key, 0)
    }

    /// Looks up a key holding a string, expanded.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    fn get_at_depth(&self, key: &str, depth: usize) -> Option<Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut value = self.root.get(first)?;

        for segment in segments {
            value = match value {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match value {
            Value::String(text) if depth < MAX_EXPANSION_DEPTH => {
                Some(Value::String(self.expand(text, depth + 1)))
            }
            other => Some(other.clone()),
        }
    }

    fn expand(&self, text: &str, depth: usize) -> String {
        placeholder_regex()
            .replace_all(text, |captures: &Captures<'_>| {
                match self.get_at_depth(&captures[1], depth) {
                    Some(Value::String(value)) => value,
                    Some(Value::Null) | None => String::new(),
                    Some(value) => value.to_string(),
                }
            })
            .into_owned()
    }
}

impl From<Map<String, Value>> for ConfigTree {
    fn from(root: Map<String, Value>) -> Self {
        Self { root }
    }
}

#[allow(clippy::expect_used)]
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"))
}

fn merge_objects(target: &mut Map<String, Value>, layer: Map<String, Value>) {
    for (key, value) in layer {
        match target.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_value(existing: &mut Value, value: Value) {
    match (existing, value) {
        (Value::Object(existing), Value::Object(value)) => merge_objects(existing, value),
        (Value::Array(existing), Value::Array(values)) => existing.extend(values),
        (Value::Array(existing), value) => existing.push(value),
        (existing, value) => *existing = value,
    }
}
