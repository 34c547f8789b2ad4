// src/exec/debugger.rs

//! Running the binary under a headless `dlv`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::config::DebuggerConfig;
use crate::errors::{Result, RunnerError};

/// First delve release that understands `--continue --accept-multiclient`
/// together with `exec`.
pub const CONTINUE_MIN_VERSION: (u64, u64, u64) = (1, 3, 0);

/// A delve version as reported by `dlv version`.
///
/// A pre-release sorts below the release it precedes, so `1.3.0-rc1` is
/// older than `1.3.0` but newer than `1.2.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DlvVersion {
    pub release: (u64, u64, u64),
    pub stable: bool,
}

impl DlvVersion {
    pub const fn stable(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            release: (major, minor, patch),
            stable: true,
        }
    }

    pub const fn pre_release(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            release: (major, minor, patch),
            stable: false,
        }
    }
}

/// Find `dlv` on `PATH`.
pub fn locate_dlv() -> Result<PathBuf> {
    which::which("dlv").map_err(|source| RunnerError::ToolNotFound {
        tool: "dlv".to_string(),
        source,
    })
}

/// Ask `dlv version` whether continue mode is available. Any failure to run
/// or parse counts as "no".
pub async fn query_supports_continue(dlv: &Path) -> bool {
    match Command::new(dlv).arg("version").output().await {
        Ok(output) => supports_continue(&String::from_utf8_lossy(&output.stdout)),
        Err(err) => {
            debug!(error = %err, "dlv version failed");
            false
        }
    }
}

/// True if the `dlv version` output reports a stable
/// [`CONTINUE_MIN_VERSION`] or anything newer.
pub fn supports_continue(version_output: &str) -> bool {
    let (major, minor, patch) = CONTINUE_MIN_VERSION;
    parse_dlv_version(version_output).is_some_and(|v| v >= DlvVersion::stable(major, minor, patch))
}

/// Extract the version from `dlv version` output such as
/// `Delve Debugger\nVersion: 1.21.0\nBuild: $Id: ... $`.
pub fn parse_dlv_version(output: &str) -> Option<DlvVersion> {
    let re = Regex::new(r"[Vv]ersion:\s+(\S+)").ok()?;
    let raw = re.captures(output)?.get(1)?.as_str();
    parse_version(raw)
}

fn parse_version(version: &str) -> Option<DlvVersion> {
    let normalized = version.trim().trim_start_matches(['v', 'V']);
    // Build metadata after `+` does not affect ordering.
    let without_build = normalized.split_once('+').map_or(normalized, |(v, _)| v);
    let (core, stable) = match without_build.split_once('-') {
        Some((core, _)) => (core, false),
        None => (without_build, true),
    };

    let mut parts = core.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    let patch = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    Some(DlvVersion {
        release: (major, minor, patch),
        stable,
    })
}

/// Arguments to `dlv` for debugging `bin`, with the program arguments after
/// `--`.
pub fn dlv_args(
    config: &DebuggerConfig,
    bin: &Path,
    use_continue: bool,
    program_args: &[String],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--headless".into(),
        "--api-version".into(),
        config.api_version.to_string().into(),
        "-l".into(),
        config.listen_addr().into(),
        "exec".into(),
        bin.into(),
    ];
    if use_continue {
        args.push("--continue".into());
        args.push("--accept-multiclient".into());
    }
    args.push("--".into());
    args.extend(program_args.iter().map(OsString::from));
    args
}
