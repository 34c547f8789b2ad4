use std::path::PathBuf;

use tempfile::TempDir;
use gorunner::config::{validate_config, RawRunnerConfig, RunnerConfig};

/// Builder for a `RunnerConfig` rooted in a fresh temporary project.
///
/// Relative paths given to the builder are created as directories under the
/// project root, so validation always succeeds.
pub struct RunnerConfigBuilder {
    root: TempDir,
    raw: RawRunnerConfig,
    tests_set: bool,
    watch_set: bool,
}

impl RunnerConfigBuilder {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("failed to create temp project"),
            raw: RawRunnerConfig::default(),
            tests_set: false,
            watch_set: false,
        }
    }

    /// Canonical path of the project root.
    pub fn root(&self) -> PathBuf {
        self.root
            .path()
            .canonicalize()
            .expect("temp dir must be canonicalizable")
    }

    /// Create `rel` (and parents) under the project root.
    pub fn with_dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.root.path().join(rel)).expect("failed to create dir");
        self
    }

    /// Create an empty file `rel` (and parent directories).
    pub fn with_file(self, rel: &str) -> Self {
        let path = self.root.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent");
        }
        std::fs::write(path, "").expect("failed to write file");
        self
    }

    /// Add a test directory. The first call replaces the default `./`.
    pub fn with_test_dir(mut self, rel: &str) -> Self {
        self = self.with_dir(rel);
        if !self.tests_set {
            self.raw.tests.clear();
            self.tests_set = true;
        }
        self.raw.tests.push(PathBuf::from(rel));
        self
    }

    /// Add a watch root. The first call replaces the default `./`.
    pub fn with_watch_dir(mut self, rel: &str) -> Self {
        self = self.with_dir(rel);
        if !self.watch_set {
            self.raw.watch_dirs.clear();
            self.watch_set = true;
        }
        self.raw.watch_dirs.push(PathBuf::from(rel));
        self
    }

    pub fn with_exclude(mut self, rel: &str) -> Self {
        self.raw.exclude_dirs.push(PathBuf::from(rel));
        self
    }

    pub fn skip_tests(mut self) -> Self {
        self.raw.run_tests = false;
        self
    }

    pub fn with_debugger(mut self) -> Self {
        self.raw.debugger.enabled = true;
        self
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.raw.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Validate against the project root. The `TempDir` is returned so the
    /// caller keeps the tree alive.
    pub fn build(self) -> (TempDir, RunnerConfig) {
        let cfg = validate_config(self.raw, self.root.path())
            .expect("Failed to build valid config from builder");
        (self.root, cfg)
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

