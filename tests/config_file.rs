// tests/config_file.rs

use std::error::Error;

use clap::Parser;
use gorunner::cli::CliArgs;
use gorunner::errors::RunnerError;
use gorunner::resolve_config;

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
entry = "cmd/server"
tests = ["pkg", "pkg"]
recursive_tests = false
watch_dirs = ["."]
exclude_dirs = ["vendor"]
args = ["-c", "dev.json"]

[build]
tags = ["sqlite"]

[debugger]
enabled = true
port = 40000
"#;

fn project() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let tmp = tempfile::tempdir()?;
    std::fs::create_dir_all(tmp.path().join("cmd/server"))?;
    std::fs::create_dir_all(tmp.path().join("pkg"))?;
    std::fs::write(tmp.path().join("gorunner.toml"), CONFIG)?;
    Ok(tmp)
}

#[test]
fn config_file_replaces_flags() -> TestResult {
    let tmp = project()?;
    let root = tmp.path().canonicalize()?;
    let config = root.join("gorunner.toml");

    let args = CliArgs::try_parse_from(["gorunner", "--skip-tests", "--config", config.to_str().unwrap()])?;
    let cfg = resolve_config(&args)?;

    assert_eq!(cfg.working_dir(), root.join("cmd/server"));
    assert_eq!(cfg.test_dirs(), [root.join("pkg")]);
    // The file wins over `--skip-tests`.
    assert!(cfg.run_tests());
    assert!(!cfg.recursive_tests());
    assert_eq!(cfg.watch_dirs(), [root.clone()]);
    assert_eq!(cfg.exclude_dirs(), [root.join("vendor")]);
    assert_eq!(cfg.args(), ["-c", "dev.json"]);
    assert_eq!(cfg.build().tags, ["sqlite"]);
    assert!(cfg.debugger().enabled);
    assert_eq!(cfg.debugger().listen_addr(), "0.0.0.0:40000");
    Ok(())
}

#[test]
fn trailing_args_override_file_args() -> TestResult {
    let tmp = project()?;
    let config = tmp.path().join("gorunner.toml");

    let args = CliArgs::try_parse_from([
        "gorunner",
        "--config",
        config.to_str().unwrap(),
        "--",
        "--port",
        "9000",
    ])?;
    let cfg = resolve_config(&args)?;

    assert_eq!(cfg.args(), ["--port", "9000"]);
    Ok(())
}

#[test]
fn missing_entry_in_file_is_a_config_error() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let config = tmp.path().join("gorunner.toml");
    std::fs::write(&config, "entry = \"does/not/exist\"\n")?;

    let args = CliArgs::try_parse_from(["gorunner", "--config", config.to_str().unwrap()])?;
    let err = resolve_config(&args).unwrap_err();

    let err = err.downcast::<RunnerError>()?;
    assert!(matches!(err, RunnerError::Config(_)));
    assert!(err.is_fatal());
    Ok(())
}
