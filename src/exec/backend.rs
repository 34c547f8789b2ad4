// src/exec/backend.rs

//! Pluggable backend abstraction for the supervisor loop.
//!
//! The supervisor loop talks to a `CycleBackend` instead of spawning
//! processes itself. Production code uses
//! [`ProcessSupervisor`](super::process::ProcessSupervisor), which runs the
//! real `go` toolchain; tests provide a fake that records calls and tracks
//! how many "children" are alive.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;

/// Boxed future returned by backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The steps of one rebuild cycle.
///
/// Every operation runs to completion before the loop moves on; only one
/// of them is ever in flight.
pub trait CycleBackend: Send {
    /// Run the test command in `dir`. An error means the tests failed or
    /// could not be started.
    fn run_test(&mut self, dir: PathBuf) -> BackendFuture<'_, Result<()>>;

    /// Produce a fresh binary, removing any stale one first.
    fn build(&mut self) -> BackendFuture<'_, Result<()>>;

    /// Start the freshly built binary (directly or under the debugger).
    fn launch(&mut self) -> BackendFuture<'_, Result<()>>;

    /// Kill and reap the running child, if any. No child is a no-op.
    fn terminate(&mut self) -> BackendFuture<'_, ()>;

    /// Remove build artifacts. Called once the session is over.
    fn cleanup(&mut self) -> Result<()>;
}
