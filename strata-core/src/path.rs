//! Path helpers for the hierarchical key space.
//!
//! Every cache key and backend path is a `/`-separated string. Directory
//! paths may be given with or without a trailing separator; the helpers here
//! are the single place that decides how such forms compare.

/// The path separator.
pub const SEPARATOR: char = '/';

/// The root directory.
pub const ROOT: &str = "/";

/// Strip trailing separators from a directory path.
///
/// The root (and any path made only of separators) normalizes to `/`.
pub fn normalize_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() && path.starts_with(SEPARATOR) {
        ROOT
    } else {
        trimmed
    }
}

/// Parent directory of `path`.
///
/// Everything before the last separator; `/` when there is no separator or
/// when the separator is the leading one.
pub fn parent_dir(path: &str) -> &str {
    let path = normalize_dir(path);
    match path.rfind(SEPARATOR) {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// `dir` with exactly one trailing separator, for prefix matching.
pub fn dir_prefix(dir: &str) -> String {
    let dir = normalize_dir(dir);
    if dir.ends_with(SEPARATOR) {
        dir.to_string()
    } else {
        format!("{}{}", dir, SEPARATOR)
    }
}

/// Returns true if `key` lies strictly underneath directory `dir`.
///
/// `/foo` does not contain `/foobar/x`.
pub fn is_within(key: &str, dir: &str) -> bool {
    key.starts_with(&dir_prefix(dir))
}

/// All proper ancestors of `path`, nearest first, ending at the root.
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut current = normalize_dir(path);
    while current != ROOT {
        let parent = parent_dir(current);
        out.push(parent);
        current = parent;
    }
    out
}

/// Final component of `path`, without any trailing separator.
pub fn file_name(path: &str) -> &str {
    let path = normalize_dir(path);
    match path.rfind(SEPARATOR) {
        Some(idx) if path != ROOT => &path[idx + 1..],
        _ => path,
    }
}
