//! Which libraries a range of commits touched.

use std::collections::BTreeMap;

use tracing::debug;

use crate::utils::process::Process;

/// Lists the files changed in the last `depth` commits of `<remote>/<branch>`.
///
/// A branch shorter than `depth` yields an empty list, like any other git
/// failure here.
pub fn modified_files(process: &Process, remote: &str, branch: &str, depth: u32) -> Vec<String> {
    let tip = format!("{remote}/{branch}");
    let base = format!("{tip}~{depth}");

    let files = process.run_array_result(&["git", "diff", "--name-only", &base, &tip]);
    debug!(%tip, depth, count = files.len(), "Modified files");
    files
}

/// Returns the configured libraries containing at least one of `files`.
///
/// Paths are matched by whole components, so `src/Lib` does not claim
/// `src/LibA/file`. The result follows the configuration order.
pub fn affected_libraries<'a>(libraries: &'a BTreeMap<String, String>, files: &[String]) -> Vec<&'a str> {
    libraries
        .keys()
        .map(String::as_str)
        .filter(|library| {
            let library = library.trim_end_matches('/');
            files.iter().any(|file| {
                file.strip_prefix(library)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
        })
        .collect()
}
