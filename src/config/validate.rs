// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use crate::config::model::{BuildOptions, DebuggerConfig, RawRunnerConfig, RunnerConfig};
use crate::errors::{Result, RunnerError};

impl TryFrom<RawRunnerConfig> for RunnerConfig {
    type Error = RunnerError;

    /// Validate against the current working directory.
    fn try_from(raw: RawRunnerConfig) -> std::result::Result<Self, Self::Error> {
        let cwd = std::env::current_dir().map_err(|e| {
            RunnerError::Config(format!("cannot determine current directory: {e}"))
        })?;
        validate_config(raw, &cwd)
    }
}

/// Validate `raw`, resolving relative paths against `base`.
///
/// - Empty `tests` / `watch_dirs` lists fall back to `base` itself.
/// - The working directory, test directories and watch roots must exist and
///   be directories; they are canonicalized.
/// - Exclude prefixes may not exist (yet); their longest existing ancestor is
///   canonicalized and the rest re-appended, so they live in the same
///   namespace as the canonical watch roots.
/// - Duplicates are dropped, keeping the first occurrence.
pub fn validate_config(raw: RawRunnerConfig, base: &Path) -> Result<RunnerConfig> {
    let working_dir = existing_dir(base, &raw.entry, "entry")?;
    let test_dirs = existing_dirs(base, &raw.tests, "tests")?;
    let watch_dirs = existing_dirs(base, &raw.watch_dirs, "watch_dirs")?;

    let mut exclude_dirs = Vec::new();
    for path in &raw.exclude_dirs {
        push_unique(&mut exclude_dirs, canonical_prefix(&absolutize(base, path)));
    }

    if raw.debugger.enabled && raw.debugger.port == 0 {
        return Err(RunnerError::Config(
            "[debugger].port must be > 0 when the debugger is enabled".to_string(),
        ));
    }

    let build = BuildOptions {
        tags: raw
            .build
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        race: raw.build.race,
        ldflags: raw.build.ldflags.filter(|s| !s.is_empty()),
        gcflags: raw.build.gcflags.filter(|s| !s.is_empty()),
    };

    let debugger = DebuggerConfig {
        enabled: raw.debugger.enabled,
        api_version: raw.debugger.api_version,
        address: raw.debugger.address,
        port: raw.debugger.port,
    };

    Ok(RunnerConfig::new_unchecked(
        working_dir,
        test_dirs,
        raw.run_tests,
        raw.recursive_tests,
        watch_dirs,
        exclude_dirs,
        raw.args,
        build,
        debugger,
    ))
}

fn existing_dirs(base: &Path, paths: &[PathBuf], key: &str) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Ok(vec![existing_dir(base, Path::new("./"), key)?]);
    }

    let mut dirs = Vec::with_capacity(paths.len());
    for path in paths {
        push_unique(&mut dirs, existing_dir(base, path, key)?);
    }
    Ok(dirs)
}

fn existing_dir(base: &Path, path: &Path, key: &str) -> Result<PathBuf> {
    let path = if path.as_os_str().is_empty() {
        Path::new("./")
    } else {
        path
    };

    let abs = absolutize(base, path);
    let canonical = abs.canonicalize().map_err(|e| {
        RunnerError::Config(format!("{key}: cannot resolve {}: {e}", abs.display()))
    })?;

    if !canonical.is_dir() {
        return Err(RunnerError::Config(format!(
            "{key}: {} is not a directory",
            canonical.display()
        )));
    }
    Ok(canonical)
}

/// Canonicalize the deepest ancestor of `abs` that exists and re-append the
/// missing tail.
fn canonical_prefix(abs: &Path) -> PathBuf {
    let mut existing = abs;
    let mut tail = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return tail.iter().rev().fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                existing = parent;
            }
            _ => return abs.to_path_buf(),
        }
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

/// Join `path` onto `base` (unless already absolute) and clean `.` / `..`
/// components lexically.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
