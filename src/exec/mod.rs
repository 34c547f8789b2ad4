// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CycleBackend` trait the supervisor loop
//!   drives, which tests replace with a fake.
//! - [`process`] is the production backend owning the single child.
//! - [`toolchain`] builds the `go build` / `go test` command lines.
//! - [`debugger`] handles locating and launching `dlv`.

pub mod backend;
pub mod debugger;
pub mod process;
pub mod toolchain;

pub use backend::{BackendFuture, CycleBackend};
pub use process::ProcessSupervisor;
pub use toolchain::{bin_path, GoToolchain, BIN_NAME};
