#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use gorunner::engine::Runner;
use gorunner::logging::MemoryLogger;
use gorunner_test_utils::builders::RunnerConfigBuilder;
use gorunner_test_utils::fake_backend::FakeBackend;
use gorunner_test_utils::fake_notifier::FakeNotifierFactory;
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A runner wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub root: PathBuf,
    pub backend: FakeBackend,
    pub notifier: FakeNotifierFactory,
    pub logger: MemoryLogger,
    pub runner: Runner,
    _tmp: TempDir,
}

impl Harness {
    pub fn new(builder: RunnerConfigBuilder, backend: FakeBackend) -> Self {
        let root = builder.root();
        let (tmp, cfg) = builder.build();
        let notifier = FakeNotifierFactory::new();
        let logger = MemoryLogger::new();
        let runner = Runner::new(
            Arc::new(cfg),
            backend.boxed(),
            notifier.boxed(),
            Arc::new(logger.clone()),
        );

        Self {
            root,
            backend,
            notifier,
            logger,
            runner,
            _tmp: tmp,
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}
