// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawRunnerConfig, RunnerConfig};
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawRunnerConfig`.
///
/// This only performs TOML deserialization; it does **not** resolve or check
/// paths. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRunnerConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawRunnerConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and validate it.
///
/// Relative paths inside the file are resolved against the directory that
/// contains the file, not the process working directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RunnerConfig> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    validate_config(raw, &config_root_dir(path))
}

/// Directory that relative paths in a config file are resolved against.
///
/// A bare filename like `gorunner.toml` (empty parent) falls back to the
/// current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RunnerError;

    #[test]
    fn parses_sections_and_defaults() {
        let raw: RawRunnerConfig = toml::from_str(
            r#"
            entry = "./cmd/server"
            run_tests = false
            args = ["-c", "config.json"]

            [build]
            tags = ["dev"]
            race = true

            [debugger]
            enabled = true
            address = "127.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(raw.entry, PathBuf::from("./cmd/server"));
        assert!(!raw.run_tests);
        assert!(raw.recursive_tests);
        assert_eq!(raw.tests, vec![PathBuf::from("./")]);
        assert_eq!(raw.build.tags, vec!["dev"]);
        assert!(raw.build.race);
        assert!(raw.debugger.enabled);
        assert_eq!(raw.debugger.port, 2345);
        assert_eq!(raw.debugger.api_version, 2);
        assert_eq!(raw.debugger.address.to_string(), "127.0.0.1");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gorunner.toml");
        fs::write(&path, "entri = \"./\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, RunnerError::TomlError(_)));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("cmd/app")).unwrap();
        let path = root.join("gorunner.toml");
        fs::write(&path, "entry = \"cmd/app\"\nexclude_dirs = [\"vendor\"]\n").unwrap();

        let cfg = load_and_validate(&path).unwrap();
        assert_eq!(cfg.working_dir(), root.join("cmd/app"));
        assert_eq!(cfg.watch_dirs(), &[root.clone()]);
        assert_eq!(cfg.exclude_dirs(), &[root.join("vendor")]);
    }
}
