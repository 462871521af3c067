//! Deterministic branch and remote names used while splitting.
//!
//! Every name is derived from the source branch and the library path only, so
//! an interrupted run can always find (and clean up) what it left behind.
//!
//! The slug is lossy: `libs/a_b` and `libs/a/b` both become `libs-a-b` and
//! therefore share a working branch and a remote alias. Library paths are not
//! checked for such collisions.

use std::sync::OnceLock;

use regex::Regex;

/// Prefix of the working branch that stages one source branch.
pub const SUBTREE_BRANCH_PREFIX: &str = "subtree__";

/// Prefix of the remote alias registered for one library.
pub const REMOTE_ALIAS_PREFIX: &str = "target-";

/// Branches selected by `split --all` when no pattern is configured.
///
/// Both alternatives are anchored, so the whole name must match: `main`,
/// `master`, `1.0` and `2.x` are selected while `release-1.0` and `1.0-dev`
/// are not. Configure `branch-pattern` to select other names.
pub const DEFAULT_SPLITTABLE_PATTERN: &str = r"(?i)^(main|master|([0-9x]+\.?)+)$";

/// Returns the working branch name for a source branch.
pub fn subtree_branch_name(branch: &str) -> String {
    format!("{SUBTREE_BRANCH_PREFIX}{branch}")
}

/// Returns the branch receiving the split history of a library.
pub fn library_branch_name(subtree_branch: &str, library_path: &str) -> String {
    format!("{subtree_branch}__{}", slug(library_path))
}

/// Returns the short-lived remote alias pointing at a library repository.
pub fn remote_alias(library_path: &str) -> String {
    format!("{REMOTE_ALIAS_PREFIX}{}", slug(library_path))
}

/// Lower-cases a library path and replaces `/`, `\` and `_` with `-`.
pub fn slug(library_path: &str) -> String {
    library_path
        .chars()
        .map(|c| match c {
            '/' | '\\' | '_' => '-',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Turns a remote URL into a file-name friendly key.
pub fn repository_key(url: &str) -> String {
    url.chars()
        .map(|c| match c {
            '@' | ':' | '/' | '.' | '#' => '-',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

#[allow(clippy::expect_used)]
fn default_splittable_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DEFAULT_SPLITTABLE_PATTERN).expect("valid default pattern"))
}

/// Checks whether `split --all` should pick up a branch.
///
/// `pattern` overrides the default pattern. An invalid pattern is an error so
/// that a typo in the configuration is reported instead of silently matching
/// nothing.
pub fn is_splittable(branch: &str, pattern: Option<&str>) -> Result<bool, regex::Error> {
    match pattern {
        Some(pattern) => Ok(Regex::new(pattern)?.is_match(branch)),
        None => Ok(default_splittable_regex().is_match(branch)),
    }
}
