// src/exec/toolchain.rs

//! Command lines for the `go` toolchain.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::{BuildOptions, RunnerConfig};
use crate::errors::{Result, RunnerError};

/// File name of the temporary binary inside the working directory.
pub const BIN_NAME: &str = "gorunner-tmp-bin";

/// Path of the temporary binary for `working_dir`, with the platform's
/// executable suffix.
pub fn bin_path(working_dir: &Path) -> PathBuf {
    working_dir.join(format!("{BIN_NAME}{}", std::env::consts::EXE_SUFFIX))
}

/// Resolved `go` binary plus everything needed to build and test.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: PathBuf,
    working_dir: PathBuf,
    bin_path: PathBuf,
    build: BuildOptions,
    recursive_tests: bool,
}

impl GoToolchain {
    /// Find `go` on `PATH`.
    pub fn locate(config: &RunnerConfig) -> Result<Self> {
        let go = which::which("go").map_err(|source| RunnerError::ToolNotFound {
            tool: "go".to_string(),
            source,
        })?;
        Ok(Self::with_go(go, config))
    }

    /// Use an explicit `go` binary.
    pub fn with_go(go: impl Into<PathBuf>, config: &RunnerConfig) -> Self {
        Self {
            go: go.into(),
            working_dir: config.working_dir().to_path_buf(),
            bin_path: bin_path(config.working_dir()),
            build: config.build().clone(),
            recursive_tests: config.recursive_tests(),
        }
    }

    pub fn go(&self) -> &Path {
        &self.go
    }

    pub fn bin_path(&self) -> &Path {
        &self.bin_path
    }

    /// Arguments to `go` for building the temporary binary.
    pub fn build_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["build".into(), "-o".into(), self.bin_path.clone().into()];

        if !self.build.tags.is_empty() {
            args.push("-tags".into());
            args.push(self.build.tags.join(" ").into());
        }
        if self.build.race {
            args.push("-race".into());
        }
        if let Some(gcflags) = &self.build.gcflags {
            args.push("-gcflags".into());
            args.push(gcflags.into());
        }
        if let Some(ldflags) = &self.build.ldflags {
            args.push("-ldflags".into());
            args.push(ldflags.into());
        }
        args
    }

    /// Arguments to `go` for running tests.
    pub fn test_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["test".into()];
        if self.recursive_tests {
            args.push("./...".into());
        }
        args
    }

    pub fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.go);
        cmd.args(self.build_args()).current_dir(&self.working_dir);
        cmd
    }

    pub fn test_command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.go);
        cmd.args(self.test_args()).current_dir(dir);
        cmd
    }

    /// Human-readable build command line, for logs and `--dry-run`.
    pub fn describe_build(&self) -> String {
        describe("go", &self.build_args())
    }
}

/// Render `program args...` for log output.
pub fn describe(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
