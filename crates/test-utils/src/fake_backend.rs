use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gorunner::errors::{Result, RunnerError};
use gorunner::exec::{BackendFuture, CycleBackend};

/// One backend call, in the order the supervisor loop made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Test(PathBuf),
    Build,
    Launch,
    Terminate,
    Cleanup,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    live: usize,
    max_live: usize,
    binary: bool,
}

/// Which failure a launch should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchFailure {
    /// A spawn error; the loop logs it and waits.
    Spawn,
    /// `dlv` missing from `PATH`; fatal.
    DebuggerMissing,
}

/// A fake backend that:
/// - records every call
/// - tracks how many "children" are alive (and the peak)
/// - can fail tests per directory, fail builds, or fail launches
/// - can slow tests down so changes land mid-gate.
///
/// Clones share state, so a test keeps one clone for assertions after the
/// other has been boxed into the runner.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<State>>,
    failing_tests: Arc<Mutex<Vec<PathBuf>>>,
    fail_build: Arc<Mutex<bool>>,
    launch_failure: Arc<Mutex<Option<LaunchFailure>>>,
    test_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_delay(mut self, delay: Duration) -> Self {
        self.test_delay = delay;
        self
    }

    pub fn fail_tests_in(&self, dir: impl Into<PathBuf>) {
        self.failing_tests.lock().unwrap().push(dir.into());
    }

    pub fn set_fail_build(&self, fail: bool) {
        *self.fail_build.lock().unwrap() = fail;
    }

    pub fn set_launch_failure(&self, failure: Option<LaunchFailure>) {
        *self.launch_failure.lock().unwrap() = failure;
    }

    pub fn boxed(&self) -> Box<dyn CycleBackend> {
        Box::new(self.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    pub fn builds(&self) -> usize {
        self.count(&Call::Build)
    }

    pub fn launches(&self) -> usize {
        self.count(&Call::Launch)
    }

    pub fn tests_in(&self, dir: &Path) -> usize {
        self.count(&Call::Test(dir.to_path_buf()))
    }

    /// Children currently alive.
    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    /// Most children ever alive at the same time.
    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    /// Whether a built binary currently exists.
    pub fn has_binary(&self) -> bool {
        self.state.lock().unwrap().binary
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl CycleBackend for FakeBackend {
    fn run_test(&mut self, dir: PathBuf) -> BackendFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(Call::Test(dir.clone()));
            if !self.test_delay.is_zero() {
                tokio::time::sleep(self.test_delay).await;
            }
            if self.failing_tests.lock().unwrap().contains(&dir) {
                return Err(anyhow::anyhow!("go test exited with exit status: 1").into());
            }
            Ok(())
        })
    }

    fn build(&mut self) -> BackendFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(Call::Build);
            let fail = *self.fail_build.lock().unwrap();
            let mut state = self.state.lock().unwrap();
            state.binary = !fail;
            if fail {
                return Err(RunnerError::BuildFailed("exit status: 2".to_string()));
            }
            Ok(())
        })
    }

    fn launch(&mut self) -> BackendFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(Call::Launch);
            match *self.launch_failure.lock().unwrap() {
                Some(LaunchFailure::Spawn) => {
                    return Err(anyhow::anyhow!("spawning binary: permission denied").into());
                }
                Some(LaunchFailure::DebuggerMissing) => {
                    return Err(RunnerError::ToolNotFound {
                        tool: "dlv".to_string(),
                        source: which::Error::CannotFindBinaryPath,
                    });
                }
                None => {}
            }

            let mut state = self.state.lock().unwrap();
            if !state.binary {
                return Err(anyhow::anyhow!("no binary to launch").into());
            }
            state.live += 1;
            state.max_live = state.max_live.max(state.live);
            Ok(())
        })
    }

    fn terminate(&mut self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.live > 0 {
                state.live -= 1;
                state.calls.push(Call::Terminate);
            }
        })
    }

    fn cleanup(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.binary = false;
        state.calls.push(Call::Cleanup);
        Ok(())
    }
}
