// src/exec/process.rs

//! Process supervisor: builds the binary and owns the single running child.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::config::RunnerConfig;
use crate::errors::{Result, RunnerError};
use crate::exec::backend::{BackendFuture, CycleBackend};
use crate::exec::debugger::{dlv_args, locate_dlv, query_supports_continue};
use crate::exec::toolchain::{describe, GoToolchain};
use crate::logging::Logger;

/// Builds, starts and kills the target program.
///
/// Holds at most one [`Child`]. Every launch terminates the previous child
/// first, and children are spawned with `kill_on_drop` so dropping the
/// supervisor never leaves one behind.
pub struct ProcessSupervisor {
    config: Arc<RunnerConfig>,
    toolchain: GoToolchain,
    child: Option<Child>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("toolchain", &self.toolchain)
            .field("child", &self.child_id())
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Locate `go` and prepare a supervisor for `config`.
    pub fn new(config: Arc<RunnerConfig>, logger: Arc<dyn Logger>) -> Result<Self> {
        let toolchain = GoToolchain::locate(&config)?;
        Ok(Self::with_toolchain(config, toolchain, logger))
    }

    pub fn with_toolchain(
        config: Arc<RunnerConfig>,
        toolchain: GoToolchain,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            config,
            toolchain,
            child: None,
            logger,
        }
    }

    pub fn bin_path(&self) -> &Path {
        self.toolchain.bin_path()
    }

    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Run `go test` in `dir` with inherited output.
    pub async fn run_test(&mut self, dir: &Path) -> Result<()> {
        let status = self
            .toolchain
            .test_command(dir)
            .status()
            .await
            .with_context(|| format!("running go test in {}", dir.display()))?;

        if !status.success() {
            return Err(anyhow!("go test exited with {status}").into());
        }
        Ok(())
    }

    /// Build a fresh binary, removing any stale one first so a failed build
    /// can never leave an old binary to run.
    pub async fn build(&mut self) -> Result<()> {
        self.remove_binary()?;

        self.logger.info(&format!(
            "Building binary with cmd: '{}'",
            self.toolchain.describe_build()
        ));

        let status = self
            .toolchain
            .build_command()
            .status()
            .await
            .with_context(|| format!("running {}", self.toolchain.go().display()))?;

        if !status.success() {
            return Err(RunnerError::BuildFailed(format!("go build exited with {status}")));
        }
        Ok(())
    }

    /// Start the freshly built binary, directly or under `dlv`.
    pub async fn launch(&mut self) -> Result<()> {
        self.terminate().await;

        let mut cmd =
            Self::run_command(&self.config, self.toolchain.bin_path(), self.logger.as_ref()).await?;
        cmd.current_dir(self.config.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.bin_path().display()))?;

        self.logger.info(&format!(
            "Started process with pid {}",
            child.id().map_or_else(|| "?".to_string(), |id| id.to_string())
        ));
        self.child = Some(child);
        Ok(())
    }

    async fn run_command(config: &RunnerConfig, bin: &Path, logger: &dyn Logger) -> Result<Command> {
        let debugger = config.debugger();
        if !debugger.enabled {
            let mut cmd = Command::new(bin);
            cmd.args(config.args());
            return Ok(cmd);
        }

        let dlv = locate_dlv()?;
        let use_continue = query_supports_continue(&dlv).await;
        let args = dlv_args(debugger, bin, use_continue, config.args());
        logger.info(&format!(
            "Starting delve with cmd: '{}'",
            describe("dlv", &args)
        ));

        let mut cmd = Command::new(dlv);
        cmd.args(args);
        Ok(cmd)
    }

    /// Kill and reap the child. No child is a no-op.
    pub async fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        let pid = child.id();
        if let Err(err) = child.start_kill() {
            self.logger.error(&format!(
                "Failed to kill process with pid '{}': {err}",
                pid.map_or_else(|| "?".to_string(), |id| id.to_string())
            ));
        }

        match child.wait().await {
            Ok(status) => debug!(?pid, %status, "child reaped"),
            Err(err) => self.logger.warn(&format!("Failed to wait for process: {err}")),
        }
    }

    /// Remove the temporary binary. A missing file is fine.
    pub fn remove_binary(&self) -> Result<()> {
        match std::fs::remove_file(self.bin_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl CycleBackend for ProcessSupervisor {
    fn run_test(&mut self, dir: PathBuf) -> BackendFuture<'_, Result<()>> {
        Box::pin(async move { ProcessSupervisor::run_test(self, &dir).await })
    }

    fn build(&mut self) -> BackendFuture<'_, Result<()>> {
        Box::pin(ProcessSupervisor::build(self))
    }

    fn launch(&mut self) -> BackendFuture<'_, Result<()>> {
        Box::pin(ProcessSupervisor::launch(self))
    }

    fn terminate(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(ProcessSupervisor::terminate(self))
    }

    fn cleanup(&mut self) -> Result<()> {
        self.remove_binary()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{validate_config, RawRunnerConfig};
    use crate::exec::toolchain::bin_path;
    use crate::logging::MemoryLogger;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script.
    fn script(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    /// A supervisor whose "go" is a shell script: `build` copies a sleeping
    /// program to the output path; `test` fails in directories named `bad`.
    fn supervisor(tmp: &Path) -> (ProcessSupervisor, MemoryLogger) {
        let fake_go = tmp.join("fake-go");
        script(
            &fake_go,
            r#"case "$1" in
  build) printf '#!/bin/sh\nexec sleep 30\n' > "$3" && chmod +x "$3" ;;
  test) [ "$(basename "$PWD")" != "bad" ] ;;
esac"#,
        );

        let cfg = validate_config(RawRunnerConfig::default(), tmp).unwrap();
        let cfg = Arc::new(cfg);
        let logger = MemoryLogger::new();
        let toolchain = GoToolchain::with_go(fake_go, &cfg);
        (
            ProcessSupervisor::with_toolchain(cfg, toolchain, Arc::new(logger.clone())),
            logger,
        )
    }

    #[tokio::test]
    async fn build_launch_terminate_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let (mut sup, logger) = supervisor(&root);

        sup.build().await.unwrap();
        assert!(sup.bin_path().exists());
        assert!(logger.contains("Building binary with cmd: 'go build -o "));

        sup.launch().await.unwrap();
        assert!(sup.has_child());
        assert!(sup.child_id().is_some());

        sup.terminate().await;
        assert!(!sup.has_child());

        // Terminating twice is a no-op.
        sup.terminate().await;

        CycleBackend::cleanup(&mut sup).unwrap();
        assert!(!bin_path(&root).exists());
    }

    #[tokio::test]
    async fn relaunch_replaces_previous_child() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let (mut sup, _) = supervisor(&root);

        sup.build().await.unwrap();
        sup.launch().await.unwrap();
        let first = sup.child_id();
        sup.launch().await.unwrap();
        let second = sup.child_id();

        assert_ne!(first, second);
        sup.terminate().await;
    }

    #[tokio::test]
    async fn failed_build_removes_stale_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let failing_go = root.join("failing-go");
        script(&failing_go, "exit 2");

        let cfg = Arc::new(validate_config(RawRunnerConfig::default(), &root).unwrap());
        let toolchain = GoToolchain::with_go(failing_go, &cfg);
        let mut sup =
            ProcessSupervisor::with_toolchain(cfg, toolchain, Arc::new(MemoryLogger::new()));

        std::fs::write(sup.bin_path(), "stale").unwrap();
        let err = sup.build().await.unwrap_err();

        assert!(matches!(err, RunnerError::BuildFailed(_)));
        assert!(!sup.bin_path().exists(), "stale binary must not survive a failed build");
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("bad")).unwrap();
        let (mut sup, _) = supervisor(&root);

        assert!(sup.run_test(&root).await.is_ok());
        assert!(sup.run_test(&root.join("bad")).await.is_err());
    }

    #[tokio::test]
    async fn launch_without_binary_fails_without_child() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let (mut sup, _) = supervisor(&root);

        assert!(sup.launch().await.is_err());
        assert!(!sup.has_child());
    }
}
