// tests/supervisor_cycle.rs

mod common;

use std::time::Duration;

use common::{Harness, TestResult};
use gorunner::logging::LogSeverity;
use gorunner::watch::FsOp;
use gorunner_test_utils::builders::RunnerConfigBuilder;
use gorunner_test_utils::fake_backend::{Call, FakeBackend, LaunchFailure};
use gorunner_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn at_most_one_child_across_rebuilds() -> TestResult {
    init_tracing();

    let backend = FakeBackend::new();
    let mut h = Harness::new(RunnerConfigBuilder::new().skip_tests(), backend.clone());
    h.runner.watch().await?;

    wait_until(|| backend.launches() == 1).await;

    for n in 2..=5 {
        assert!(h.notifier.emit(h.path("main.go"), FsOp::Write));
        wait_until(|| backend.launches() == n).await;
    }

    h.runner.stop().await?;

    assert!(backend.max_live() <= 1, "two children were alive at once");
    assert_eq!(backend.live(), 0);
    assert!(!backend.has_binary());
    assert_eq!(backend.calls().last(), Some(&Call::Cleanup));
    Ok(())
}

#[tokio::test]
async fn every_relaunch_is_preceded_by_a_terminate() -> TestResult {
    let backend = FakeBackend::new();
    let mut h = Harness::new(RunnerConfigBuilder::new().skip_tests(), backend.clone());
    h.runner.watch().await?;

    wait_until(|| backend.launches() == 1).await;
    h.notifier.emit(h.path("main.go"), FsOp::Write);
    wait_until(|| backend.launches() == 2).await;
    h.runner.stop().await?;

    assert_eq!(
        backend.calls(),
        vec![
            Call::Build,
            Call::Launch,
            Call::Terminate,
            Call::Build,
            Call::Launch,
            Call::Terminate,
            Call::Cleanup,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn burst_during_test_gate_causes_exactly_one_more_build() -> TestResult {
    init_tracing();

    let backend = FakeBackend::new().with_test_delay(Duration::from_millis(300));
    let mut h = Harness::new(RunnerConfigBuilder::new(), backend.clone());
    h.runner.watch().await?;

    wait_until(|| backend.tests_in(&h.root) == 1).await;
    for name in ["a.go", "b.go", "c.go"] {
        h.notifier.emit(h.path(name), FsOp::Write);
    }

    wait_until(|| backend.launches() == 2).await;
    // Give a spurious third cycle time to show up.
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(backend.builds(), 2);
    assert_eq!(backend.launches(), 2);
    assert_eq!(backend.max_live(), 1);

    h.runner.stop().await?;
    Ok(())
}

#[tokio::test]
async fn change_between_test_dirs_restarts_the_cycle() -> TestResult {
    let backend = FakeBackend::new().with_test_delay(Duration::from_millis(200));
    let mut h = Harness::new(
        RunnerConfigBuilder::new().with_test_dir("a").with_test_dir("b"),
        backend.clone(),
    );
    let (a, b) = (h.path("a"), h.path("b"));
    h.runner.watch().await?;

    wait_until(|| backend.tests_in(&a) == 1).await;
    h.notifier.emit(h.path("a/a.go"), FsOp::Write);

    wait_until(|| backend.launches() == 1).await;
    h.runner.stop().await?;

    // The stale pass stops before `b`, then the whole gate runs again.
    assert_eq!(backend.tests_in(&a), 2);
    assert_eq!(backend.tests_in(&b), 1);
    assert_eq!(backend.builds(), 1);
    assert!(h.logger.contains("restarting cycle"));
    Ok(())
}

#[tokio::test]
async fn failing_tests_do_not_block_the_build() -> TestResult {
    let backend = FakeBackend::new();
    let mut h = Harness::new(
        RunnerConfigBuilder::new().with_test_dir("a").with_test_dir("b"),
        backend.clone(),
    );
    let (a, b) = (h.path("a"), h.path("b"));
    backend.fail_tests_in(&a);
    h.runner.watch().await?;

    wait_until(|| backend.launches() == 1).await;
    h.runner.stop().await?;

    let calls = backend.calls();
    assert_eq!(calls[..3], [Call::Test(a.clone()), Call::Test(b.clone()), Call::Build]);

    let errors = h.logger.messages(LogSeverity::Error);
    assert!(errors.iter().any(|m| m.contains(&format!("Test run for '{}' failed", a.display()))));
    assert!(h.logger.contains(&format!("Test run for '{}' successful", b.display())));
    Ok(())
}

#[tokio::test]
async fn failed_build_skips_launch_until_next_change() -> TestResult {
    let backend = FakeBackend::new();
    backend.set_fail_build(true);
    let mut h = Harness::new(RunnerConfigBuilder::new().skip_tests(), backend.clone());
    h.runner.watch().await?;

    wait_until(|| backend.builds() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.launches(), 0);
    assert!(h.logger.contains("Failed to build binary"));

    backend.set_fail_build(false);
    h.notifier.emit(h.path("main.go"), FsOp::Write);
    wait_until(|| backend.launches() == 1).await;
    assert_eq!(backend.builds(), 2);

    h.runner.stop().await?;
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_logged_and_the_session_continues() -> TestResult {
    let backend = FakeBackend::new();
    backend.set_launch_failure(Some(LaunchFailure::Spawn));
    let mut h = Harness::new(RunnerConfigBuilder::new().skip_tests(), backend.clone());
    h.runner.watch().await?;

    wait_until(|| h.logger.contains("Failed to start process")).await;
    assert!(h.runner.is_watching());

    backend.set_launch_failure(None);
    h.notifier.emit(h.path("main.go"), FsOp::Write);
    wait_until(|| backend.live() == 1).await;

    h.runner.stop().await?;
    assert_eq!(backend.live(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_debugger_ends_the_session() -> TestResult {
    let backend = FakeBackend::new();
    backend.set_launch_failure(Some(LaunchFailure::DebuggerMissing));
    let mut h = Harness::new(RunnerConfigBuilder::new().skip_tests(), backend.clone());
    h.runner.watch().await?;

    gorunner_test_utils::with_timeout(h.runner.closed()).await;

    let err = h.runner.stop().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("dlv"));
    assert!(!h.runner.is_watching());
    assert_eq!(backend.live(), 0);
    assert!(!backend.has_binary());
    Ok(())
}

#[tokio::test]
async fn only_trigger_files_rebuild() -> TestResult {
    let backend = FakeBackend::new();
    let mut h = Harness::new(RunnerConfigBuilder::new().skip_tests(), backend.clone());
    h.runner.watch().await?;
    wait_until(|| backend.launches() == 1).await;

    h.notifier.emit(h.path("notes.txt"), FsOp::Write);
    h.notifier.emit(h.path("Makefile"), FsOp::Create);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.builds(), 1);

    h.notifier.emit(h.path("go.sum"), FsOp::Write);
    wait_until(|| backend.builds() == 2).await;

    h.runner.stop().await?;
    Ok(())
}
