// src/config/mod.rs

//! Runner configuration.
//!
//! Responsibilities:
//! - Define the raw (CLI / TOML) shape and the validated value (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve and check paths (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    BuildOptions, DebuggerConfig, RawBuildOptions, RawDebuggerConfig, RawRunnerConfig,
    RunnerConfig,
};
pub use validate::validate_config;
