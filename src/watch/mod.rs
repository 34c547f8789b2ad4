// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which paths matter (`filter`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) behind the
//!   `ChangeNotifier` trait.
//! - Keeping the set of watched directories current and turning source
//!   changes into rebuild requests (`tracker`).
//!
//! It does **not** run anything; it only pokes the rebuild signal.

pub mod filter;
pub mod notifier;
pub mod tracker;
pub mod watcher;

pub use filter::{is_excluded_dir, is_excluded_prefix, is_trigger_file};
pub use notifier::{ChangeNotifier, FsEvent, FsOp, NotifierFactory, NotifierHandle, NotifierMessage};
pub use tracker::{DirectoryTracker, EventEffect};
pub use watcher::{NotifyFactory, NotifyWatcher};
