// src/engine/mod.rs

//! Orchestration engine for gorunner.
//!
//! - [`signal`]: the rebuild mailbox and the shutdown token shared by the
//!   two workers.
//! - [`supervisor`]: the test → build → run → wait state machine.
//! - [`runner`]: the `watch()` / `stop()` lifecycle owning both workers.

pub mod runner;
pub mod signal;
pub mod supervisor;

pub use runner::Runner;
pub use signal::{rebuild_signal, shutdown_token, RebuildReceiver, RebuildSender, Shutdown, ShutdownListener};
pub use supervisor::{CycleState, GateOutcome, SupervisorExit, SupervisorLoop};
