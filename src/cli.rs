// src/cli.rs

//! CLI argument parsing using `clap`.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{RawBuildOptions, RawDebuggerConfig, RawRunnerConfig};

/// Command-line arguments for `gorunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gorunner",
    version,
    about = "Watch *.go, go.mod and go.sum files, then test, rebuild and restart a Go program.",
    long_about = None,
    after_help = "Arguments after `--` are passed to the program, e.g.\n  gorunner -e ./cmd/server -- -c config.json --http=:8080"
)]
pub struct CliArgs {
    /// The directory with the main package.
    #[arg(short = 'e', long = "entry", value_name = "DIR", default_value = "./")]
    pub entry: PathBuf,

    /// Test directories in which `go test` is executed.
    #[arg(
        short = 't',
        long = "tests",
        value_name = "DIRS",
        value_delimiter = ',',
        default_value = "./"
    )]
    pub tests: Vec<PathBuf>,

    /// Don't run any tests.
    #[arg(short = 's', long)]
    pub skip_tests: bool,

    /// Don't run tests recursively (`go test` instead of `go test ./...`).
    #[arg(short = 'r', long)]
    pub test_non_recursive: bool,

    /// Directories to watch recursively for changes (*.go, go.mod, go.sum).
    #[arg(
        short = 'w',
        long = "watch-dirs",
        value_name = "DIRS",
        value_delimiter = ',',
        default_value = "./"
    )]
    pub watch_dirs: Vec<PathBuf>,

    /// Don't listen to changes in these directories.
    #[arg(short = 'x', long = "exclude-dirs", value_name = "DIRS", value_delimiter = ',')]
    pub exclude_dirs: Vec<PathBuf>,

    /// Build tags passed to `go build -tags`.
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Build the binary with the race detector enabled.
    #[arg(long)]
    pub race: bool,

    /// Flags passed to `go build -ldflags`.
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub ldflags: Option<String>,

    /// Flags passed to `go build -gcflags`.
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub gcflags: Option<String>,

    /// Use delve to run the program.
    #[arg(short = 'd', long)]
    pub use_dlv: bool,

    /// Listen port for delve.
    #[arg(short = 'p', long, default_value_t = 2345)]
    pub port: u16,

    /// Listen address for delve.
    #[arg(short = 'a', long, default_value = "0.0.0.0")]
    pub address: IpAddr,

    /// API version to use for the delve server.
    #[arg(short = 'v', long, default_value_t = 2)]
    pub api_version: u8,

    /// Read the runner configuration from a TOML file instead of the flags
    /// above. Program arguments after `--` still override the file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GORUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the configuration, but don't watch or build.
    #[arg(long)]
    pub dry_run: bool,

    /// Arguments passed through to the program.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl CliArgs {
    /// Map the flags onto the unvalidated configuration shape shared with
    /// the TOML loader.
    pub fn to_raw_config(&self) -> RawRunnerConfig {
        RawRunnerConfig {
            entry: self.entry.clone(),
            tests: self.tests.clone(),
            run_tests: !self.skip_tests,
            recursive_tests: !self.test_non_recursive,
            watch_dirs: self.watch_dirs.clone(),
            exclude_dirs: self.exclude_dirs.clone(),
            args: self.args.clone(),
            build: RawBuildOptions {
                tags: self.tags.clone(),
                race: self.race,
                ldflags: self.ldflags.clone(),
                gcflags: self.gcflags.clone(),
            },
            debugger: RawDebuggerConfig {
                enabled: self.use_dlv,
                api_version: self.api_version,
                address: self.address,
                port: self.port,
            },
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
