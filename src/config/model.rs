// src/config/model.rs

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Unvalidated runner configuration, as produced by the CLI or read from a
/// TOML file.
///
/// ```toml
/// entry = "./cmd/server"
/// tests = ["./"]
/// watch_dirs = ["./"]
/// exclude_dirs = ["./vendor"]
/// args = ["-c", "config.json"]
///
/// [build]
/// tags = ["dev"]
/// ldflags = "-s -w"
///
/// [debugger]
/// enabled = true
/// port = 2345
/// ```
///
/// Every key is optional; missing keys take the same defaults as the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRunnerConfig {
    /// Directory containing the main package.
    #[serde(default = "default_dir")]
    pub entry: PathBuf,

    /// Directories in which `go test` runs, in order.
    #[serde(default = "default_dirs")]
    pub tests: Vec<PathBuf>,

    #[serde(default = "default_true")]
    pub run_tests: bool,

    /// `go test ./...` instead of `go test`.
    #[serde(default = "default_true")]
    pub recursive_tests: bool,

    #[serde(default = "default_dirs")]
    pub watch_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub exclude_dirs: Vec<PathBuf>,

    /// Arguments passed through to the program.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub build: RawBuildOptions,

    #[serde(default)]
    pub debugger: RawDebuggerConfig,
}

/// `[build]` section: flags forwarded to `go build`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBuildOptions {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub race: bool,
    #[serde(default)]
    pub ldflags: Option<String>,
    #[serde(default)]
    pub gcflags: Option<String>,
}

/// `[debugger]` section: run the binary under a headless `dlv`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDebuggerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_version")]
    pub api_version: u8,
    #[serde(default = "default_address")]
    pub address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_dirs() -> Vec<PathBuf> {
    vec![default_dir()]
}

fn default_true() -> bool {
    true
}

fn default_api_version() -> u8 {
    2
}

fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    2345
}

impl Default for RawDebuggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_version: default_api_version(),
            address: default_address(),
            port: default_port(),
        }
    }
}

impl Default for RawRunnerConfig {
    fn default() -> Self {
        Self {
            entry: default_dir(),
            tests: default_dirs(),
            run_tests: true,
            recursive_tests: true,
            watch_dirs: default_dirs(),
            exclude_dirs: Vec::new(),
            args: Vec::new(),
            build: RawBuildOptions::default(),
            debugger: RawDebuggerConfig::default(),
        }
    }
}

/// Flags forwarded to `go build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub tags: Vec<String>,
    pub race: bool,
    pub ldflags: Option<String>,
    pub gcflags: Option<String>,
}

/// Debugger-attach settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerConfig {
    pub enabled: bool,
    pub api_version: u8,
    pub address: IpAddr,
    pub port: u16,
}

impl DebuggerConfig {
    /// `address:port` as passed to `dlv -l`.
    pub fn listen_addr(&self) -> String {
        std::net::SocketAddr::new(self.address, self.port).to_string()
    }
}

/// Validated runner configuration.
///
/// All paths are absolute and de-duplicated. Construct via
/// `RunnerConfig::try_from(raw)` or [`crate::config::validate_config`]; the
/// value is immutable afterwards.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    working_dir: PathBuf,
    test_dirs: Vec<PathBuf>,
    run_tests: bool,
    recursive_tests: bool,
    watch_dirs: Vec<PathBuf>,
    exclude_dirs: Vec<PathBuf>,
    args: Vec<String>,
    build: BuildOptions,
    debugger: DebuggerConfig,
}

impl RunnerConfig {
    /// Construct without validation (used by `validate`).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_unchecked(
        working_dir: PathBuf,
        test_dirs: Vec<PathBuf>,
        run_tests: bool,
        recursive_tests: bool,
        watch_dirs: Vec<PathBuf>,
        exclude_dirs: Vec<PathBuf>,
        args: Vec<String>,
        build: BuildOptions,
        debugger: DebuggerConfig,
    ) -> Self {
        Self {
            working_dir,
            test_dirs,
            run_tests,
            recursive_tests,
            watch_dirs,
            exclude_dirs,
            args,
            build,
            debugger,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn test_dirs(&self) -> &[PathBuf] {
        &self.test_dirs
    }

    pub fn run_tests(&self) -> bool {
        self.run_tests
    }

    pub fn recursive_tests(&self) -> bool {
        self.recursive_tests
    }

    pub fn watch_dirs(&self) -> &[PathBuf] {
        &self.watch_dirs
    }

    pub fn exclude_dirs(&self) -> &[PathBuf] {
        &self.exclude_dirs
    }

    /// Arguments passed through to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn build(&self) -> &BuildOptions {
        &self.build
    }

    pub fn debugger(&self) -> &DebuggerConfig {
        &self.debugger
    }
}
