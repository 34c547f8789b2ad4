// src/engine/supervisor.rs

//! The supervisor loop: test → build → run → wait, forever.
//!
//! One cycle walks the states
//! `Idle → Testing → Building → Running → Waiting → {Idle | Stopped}`.
//! Every backend call is awaited to completion before the next state, so at
//! most one test, build or run is ever in flight. The only places the loop
//! looks at the outside world are the test gate (between test directories)
//! and `Waiting`.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::RunnerConfig;
use crate::engine::signal::{RebuildReceiver, Shutdown, ShutdownListener};
use crate::errors::RunnerError;
use crate::exec::CycleBackend;
use crate::logging::Logger;

/// Where the loop is within a rebuild cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Testing,
    Building,
    Running,
    Waiting,
    Stopped,
}

/// How a pass through the test gate ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// All directories ran (or tests are disabled); carry on building.
    Completed,
    /// A change arrived mid-pass; start the cycle over.
    Restart,
    Shutdown,
}

/// What the supervisor worker hands back when it exits.
pub struct SupervisorExit {
    pub backend: Box<dyn CycleBackend>,
    /// Set when the loop stopped because of an environment error.
    pub fatal: Option<RunnerError>,
}

impl fmt::Debug for SupervisorExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorExit")
            .field("fatal", &self.fatal)
            .finish_non_exhaustive()
    }
}

pub struct SupervisorLoop {
    config: Arc<RunnerConfig>,
    backend: Box<dyn CycleBackend>,
    rebuild: RebuildReceiver,
    shutdown: Shutdown,
    listener: ShutdownListener,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for SupervisorLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorLoop")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SupervisorLoop {
    pub fn new(
        config: Arc<RunnerConfig>,
        backend: Box<dyn CycleBackend>,
        rebuild: RebuildReceiver,
        shutdown: Shutdown,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let listener = shutdown.subscribe();
        Self {
            config,
            backend,
            rebuild,
            shutdown,
            listener,
            logger,
        }
    }

    /// Drive cycles until shutdown or a fatal error.
    ///
    /// On a fatal error the shutdown token is fired so the event worker
    /// stops too; the error travels back in [`SupervisorExit::fatal`].
    pub async fn run(mut self) -> SupervisorExit {
        let mut state = CycleState::Idle;
        let mut fatal = None;

        while state != CycleState::Stopped {
            debug!(?state, "supervisor state");
            state = match state {
                CycleState::Idle => {
                    if self.listener.is_triggered() {
                        CycleState::Stopped
                    } else {
                        CycleState::Testing
                    }
                }
                CycleState::Testing => match self.test_gate().await {
                    GateOutcome::Completed => CycleState::Building,
                    GateOutcome::Restart => CycleState::Idle,
                    GateOutcome::Shutdown => CycleState::Stopped,
                },
                CycleState::Building => match self.backend.build().await {
                    Ok(()) => CycleState::Running,
                    Err(err) if err.is_fatal() => {
                        fatal = Some(err);
                        CycleState::Stopped
                    }
                    Err(err) => {
                        self.logger.error(&format!("Failed to build binary: {err}"));
                        CycleState::Waiting
                    }
                },
                CycleState::Running => match self.backend.launch().await {
                    Ok(()) => CycleState::Waiting,
                    Err(err) if err.is_fatal() => {
                        fatal = Some(err);
                        CycleState::Stopped
                    }
                    Err(err) => {
                        self.logger.error(&format!("Failed to start process: {err}"));
                        CycleState::Waiting
                    }
                },
                CycleState::Waiting => self.wait_for_change().await,
                CycleState::Stopped => CycleState::Stopped,
            };
        }

        self.backend.terminate().await;

        if let Some(err) = &fatal {
            self.logger.error(&format!("Stopping: {err}"));
            self.shutdown.fire();
        }

        debug!("supervisor loop finished");
        SupervisorExit {
            backend: self.backend,
            fatal,
        }
    }

    /// Suspend until a rebuild or shutdown; either way the current child is
    /// killed before moving on.
    async fn wait_for_change(&mut self) -> CycleState {
        let next = tokio::select! {
            biased;

            _ = self.listener.wait() => CycleState::Stopped,
            _ = self.rebuild.recv() => CycleState::Idle,
        };

        self.backend.terminate().await;
        next
    }

    /// Run the configured test directories in order. Failures are logged and
    /// never block the build. Before each directory the loop checks for
    /// shutdown and for a newer change, in which case the stale pass is
    /// abandoned and the whole cycle restarts.
    async fn test_gate(&mut self) -> GateOutcome {
        if !self.config.run_tests() {
            return GateOutcome::Completed;
        }

        self.logger.info("Running tests...");
        let config = Arc::clone(&self.config);
        for dir in config.test_dirs() {
            if self.listener.is_triggered() {
                return GateOutcome::Shutdown;
            }
            if self.rebuild.try_recv() {
                self.logger.info("Files changed while testing, restarting cycle");
                return GateOutcome::Restart;
            }

            match self.backend.run_test(dir.clone()).await {
                Ok(()) => self
                    .logger
                    .info(&format!("Test run for '{}' successful", dir.display())),
                Err(err) => self.logger.error(&format!(
                    "Test run for '{}' failed: {err}",
                    dir.display()
                )),
            }
        }

        GateOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{validate_config, RawRunnerConfig};
    use crate::engine::signal::{rebuild_signal, shutdown_token};
    use crate::errors::Result;
    use crate::exec::BackendFuture;
    use crate::logging::MemoryLogger;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend whose launch fails with a fatal error.
    #[derive(Clone, Default)]
    struct Script {
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CycleBackend for Script {
        fn run_test(&mut self, _dir: PathBuf) -> BackendFuture<'_, Result<()>> {
            self.calls.lock().unwrap().push("test");
            Box::pin(async { Ok(()) })
        }
        fn build(&mut self) -> BackendFuture<'_, Result<()>> {
            self.calls.lock().unwrap().push("build");
            Box::pin(async { Ok(()) })
        }
        fn launch(&mut self) -> BackendFuture<'_, Result<()>> {
            self.calls.lock().unwrap().push("launch");
            Box::pin(async { Err(RunnerError::Config("no debugger".into())) })
        }
        fn terminate(&mut self) -> BackendFuture<'_, ()> {
            self.calls.lock().unwrap().push("terminate");
            Box::pin(async {})
        }
        fn cleanup(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn fatal_error_fires_shutdown_and_is_returned() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = RawRunnerConfig {
            run_tests: false,
            ..RawRunnerConfig::default()
        };
        let cfg = Arc::new(validate_config(raw, tmp.path()).unwrap());
        let script = Script::default();
        let logger = MemoryLogger::new();
        let (_tx, rx) = rebuild_signal();
        let (shutdown, listener) = shutdown_token();

        let exit = tokio::time::timeout(
            Duration::from_secs(5),
            SupervisorLoop::new(cfg, Box::new(script.clone()), rx, shutdown, Arc::new(logger.clone()))
                .run(),
        )
        .await
        .unwrap();

        assert!(matches!(exit.fatal, Some(RunnerError::Config(_))));
        assert!(listener.is_triggered());
        assert_eq!(*script.calls.lock().unwrap(), ["build", "launch", "terminate"]);
        assert!(logger.contains("Stopping: Configuration error: no debugger"));
    }

    #[tokio::test]
    async fn fired_token_stops_before_any_work() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Arc::new(validate_config(RawRunnerConfig::default(), tmp.path()).unwrap());
        let script = Script::default();
        let (_tx, rx) = rebuild_signal();
        let (shutdown, _listener) = shutdown_token();
        shutdown.fire();

        let exit = SupervisorLoop::new(
            cfg,
            Box::new(script.clone()),
            rx,
            shutdown,
            Arc::new(MemoryLogger::new()),
        )
        .run()
        .await;

        assert!(exit.fatal.is_none());
        assert_eq!(*script.calls.lock().unwrap(), ["terminate"]);
    }
}
