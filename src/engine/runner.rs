// src/engine/runner.rs

//! Session lifecycle: `watch()` starts the two workers, `stop()` tears them
//! down and reclaims the notifier and the temporary binary.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::RunnerConfig;
use crate::engine::signal::{rebuild_signal, shutdown_token, Shutdown, ShutdownListener};
use crate::engine::supervisor::{SupervisorExit, SupervisorLoop};
use crate::errors::{Result, RunnerError};
use crate::exec::{CycleBackend, ProcessSupervisor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::{Logger, TracingLogger};
use crate::watch::{DirectoryTracker, NotifierFactory, NotifyFactory};

/// One active watch session.
struct Session {
    shutdown: Shutdown,
    closed: ShutdownListener,
    event_worker: JoinHandle<DirectoryTracker>,
    supervisor: JoinHandle<SupervisorExit>,
}

/// Watches the configured directories and keeps the target program
/// rebuilt and running.
///
/// At most one session is active at a time. The backend is moved into the
/// supervisor worker for the duration of a session and handed back by
/// [`Runner::stop`], so the runner can be restarted afterwards.
pub struct Runner {
    config: Arc<RunnerConfig>,
    logger: Arc<dyn Logger>,
    fs: Arc<dyn FileSystem>,
    notifiers: Box<dyn NotifierFactory>,
    backend: Option<Box<dyn CycleBackend>>,
    session: Option<Session>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("watching", &self.is_watching())
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(
        config: Arc<RunnerConfig>,
        backend: Box<dyn CycleBackend>,
        notifiers: Box<dyn NotifierFactory>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            config,
            logger,
            fs: Arc::new(RealFileSystem),
            notifiers,
            backend: Some(backend),
            session: None,
        }
    }

    /// Swap the file system used for directory walks.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Production wiring: real `go` toolchain, OS notifier, `tracing` output.
    ///
    /// Fails with [`RunnerError::ToolNotFound`] if `go` is not on `PATH`.
    pub fn from_config(config: RunnerConfig) -> Result<Self> {
        let config = Arc::new(config);
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
        let backend = ProcessSupervisor::new(Arc::clone(&config), Arc::clone(&logger))?;
        Ok(Self::new(
            config,
            Box::new(backend),
            Box::new(NotifyFactory),
            logger,
        ))
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session: register the watch roots, then spawn the event
    /// worker and the supervisor worker.
    ///
    /// The initial directory walk runs on the blocking pool; the watch set
    /// is complete once this returns.
    pub async fn watch(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(RunnerError::AlreadyWatching);
        }
        let Some(backend) = self.backend.take() else {
            return Err(anyhow!("runner backend was lost by a crashed session").into());
        };
        let handle = match self.notifiers.create() {
            Ok(handle) => handle,
            Err(err) => {
                self.backend = Some(backend);
                return Err(err);
            }
        };

        let mut tracker = DirectoryTracker::new(
            handle.notifier,
            Arc::clone(&self.fs),
            self.config.exclude_dirs().to_vec(),
            Arc::clone(&self.logger),
        );
        let roots = self.config.watch_dirs().to_vec();
        let walk = tokio::task::spawn_blocking(move || {
            tracker.enlist(&roots);
            tracker
        });
        let tracker = match walk.await {
            Ok(tracker) => tracker,
            Err(err) => {
                self.backend = Some(backend);
                return Err(anyhow!("initial directory walk failed: {err}").into());
            }
        };
        debug!(watched = tracker.watched().len(), "initial watch set registered");

        let (rebuild_tx, rebuild_rx) = rebuild_signal();
        let (shutdown, closed) = shutdown_token();

        let event_worker = tokio::spawn(tracker.run(handle.messages, rebuild_tx, shutdown.subscribe()));
        let supervisor = tokio::spawn(
            SupervisorLoop::new(
                Arc::clone(&self.config),
                backend,
                rebuild_rx,
                shutdown.clone(),
                Arc::clone(&self.logger),
            )
            .run(),
        );

        self.session = Some(Session {
            shutdown,
            closed,
            event_worker,
            supervisor,
        });
        Ok(())
    }

    /// Resolve once the current session's shutdown token has fired, either
    /// through [`Runner::stop`] or because the supervisor hit a fatal error.
    /// Pends forever when no session is active.
    pub async fn closed(&self) {
        match &self.session {
            Some(session) => session.closed.clone().wait().await,
            None => std::future::pending().await,
        }
    }

    /// End the session and wait for both workers to acknowledge.
    ///
    /// No session is a no-op. Returns the fatal error that ended the session
    /// early, if there was one.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        self.logger.info("Stop looking for file changes");
        session.shutdown.fire();

        let tracker = session
            .event_worker
            .await
            .map_err(|err| anyhow!("event worker panicked: {err}"));
        let exit = session
            .supervisor
            .await
            .map_err(|err| anyhow!("supervisor worker panicked: {err}"));

        let mut first_err: Option<RunnerError> = None;

        match tracker {
            Ok(tracker) => {
                if let Err(err) = tracker.close() {
                    self.logger
                        .warn(&format!("Failed to close the file watcher: {err}"));
                }
            }
            Err(err) => first_err = Some(err.into()),
        }

        match exit {
            Ok(SupervisorExit { mut backend, fatal }) => {
                if let Err(err) = backend.cleanup() {
                    self.logger
                        .warn(&format!("Failed to remove temporary binary: {err}"));
                }
                self.backend = Some(backend);
                first_err = first_err.or(fatal);
            }
            Err(err) => first_err = first_err.or(Some(err.into())),
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.shutdown.fire();
        }
    }
}
