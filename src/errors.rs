// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runner already watching for file changes")]
    AlreadyWatching,

    #[error("Required tool '{tool}' not found on PATH: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("File watcher error: {0}")]
    Notifier(#[from] notify::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunnerError {
    /// Environment errors abort the whole program; everything else is
    /// logged and the supervisor waits for the next change.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunnerError::ToolNotFound { .. } | RunnerError::Config(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunnerError>;
