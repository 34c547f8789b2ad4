// src/watch/filter.rs

//! Path predicates deciding what the watcher cares about.
//!
//! Pure functions only: no file-system access, so callers decide whether a
//! path is a directory before asking.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Extension of compiled source files.
pub const SOURCE_EXTENSION: &str = "go";

/// Build manifests whose changes always trigger a rebuild.
pub const MANIFEST_FILES: [&str; 2] = ["go.mod", "go.sum"];

/// True if a change to `path` should trigger a rebuild.
pub fn is_trigger_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(OsStr::to_str) {
        if MANIFEST_FILES.contains(&name) {
            return true;
        }
    }
    path.extension() == Some(OsStr::new(SOURCE_EXTENSION))
}

/// True if `path` lies at or below one of the exclude prefixes.
///
/// Matching is per path component, so excluding `/src/vendor` does not
/// exclude `/src/vendored`.
pub fn is_excluded_prefix(path: &Path, excludes: &[PathBuf]) -> bool {
    excludes.iter().any(|prefix| path.starts_with(prefix))
}

/// True if `path` starts with `.`.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with('.'))
}

/// True if directory `path` must not be watched (nor walked into).
pub fn is_excluded_dir(path: &Path, excludes: &[PathBuf]) -> bool {
    is_excluded_prefix(path, excludes) || is_hidden(path)
}
