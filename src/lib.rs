// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{config_root_dir, load_from_path};
use crate::config::{validate_config, RunnerConfig};
use crate::engine::Runner;
use crate::exec::GoToolchain;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (flags or `--config` file)
/// - the runner session (watcher + supervisor)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut runner = Runner::from_config(cfg)?;
    runner.watch().await?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                eprintln!("failed to listen for Ctrl+C: {e}");
            }
        }
        _ = runner.closed() => {
            debug!("session closed on its own");
        }
    }

    info!("Shutting down gorunner...");
    runner.stop().await?;
    Ok(())
}

/// Build the validated configuration from the flags, or from the file given
/// with `--config`. Trailing program arguments on the command line replace
/// the file's `args` when present.
pub fn resolve_config(args: &CliArgs) -> Result<RunnerConfig> {
    let cfg = match &args.config {
        Some(path) => {
            let mut raw = load_from_path(path)?;
            if !args.args.is_empty() {
                raw.args = args.args.clone();
            }
            validate_config(raw, &config_root_dir(path))?
        }
        None => RunnerConfig::try_from(args.to_raw_config())?,
    };
    Ok(cfg)
}

/// Simple dry-run output: print the resolved configuration and commands.
fn print_dry_run(cfg: &RunnerConfig) {
    println!("gorunner dry-run");
    println!("  working_dir = {}", cfg.working_dir().display());
    println!("  run_tests = {}", cfg.run_tests());
    if cfg.run_tests() {
        println!("  recursive_tests = {}", cfg.recursive_tests());
        println!("  test_dirs:");
        for dir in cfg.test_dirs() {
            println!("    - {}", dir.display());
        }
    }
    println!();

    println!("watch_dirs ({}):", cfg.watch_dirs().len());
    for dir in cfg.watch_dirs() {
        println!("  - {}", dir.display());
    }
    if !cfg.exclude_dirs().is_empty() {
        println!("exclude_dirs ({}):", cfg.exclude_dirs().len());
        for dir in cfg.exclude_dirs() {
            println!("  - {}", dir.display());
        }
    }
    println!();

    let toolchain = GoToolchain::with_go("go", cfg);
    println!("build: {}", toolchain.describe_build());

    let debugger = cfg.debugger();
    if debugger.enabled {
        println!(
            "run: dlv --headless --api-version {} -l {} exec {}",
            debugger.api_version,
            debugger.listen_addr(),
            toolchain.bin_path().display()
        );
    } else {
        println!("run: {}", toolchain.bin_path().display());
    }
    if !cfg.args().is_empty() {
        println!("  args: {:?}", cfg.args());
    }

    debug!("dry-run complete (no execution)");
}
