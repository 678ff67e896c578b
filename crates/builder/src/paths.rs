//! Search-path merging
//!
//! Toolchain-provided paths come first and ambient environment paths second.
//! Order of first occurrence decides which directory wins on a name collision,
//! so it is preserved exactly.

use std::collections::HashSet;

/// Separator used for path lists in environment variables
pub const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Merge two ordered path lists, keeping only the first occurrence of each value
#[must_use]
pub fn unique_paths<A, B>(first: &[A], second: &[B]) -> Vec<String>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut seen = HashSet::new();
    first
        .iter()
        .map(AsRef::as_ref)
        .chain(second.iter().map(AsRef::as_ref))
        .filter(|path| seen.insert(*path))
        .map(str::to_string)
        .collect()
}

/// Merge toolchain and environment paths into a search path without empty entries
#[must_use]
pub fn merge_search_paths<A, B>(toolchain: &[A], environment: &[B]) -> Vec<String>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut merged = unique_paths(toolchain, environment);
    merged.retain(|path| !path.is_empty());
    merged
}

/// Join paths with the platform separator
#[must_use]
pub fn join_paths(paths: &[String]) -> String {
    paths.join(&PATH_SEPARATOR.to_string())
}
