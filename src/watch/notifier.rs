// src/watch/notifier.rs

//! The change-notifier capability the directory tracker is written against.
//!
//! A notifier watches individual directories (non-recursively) and reports
//! what happened to paths inside them. Events and errors arrive on one
//! unbounded stream; closing the notifier ends that stream.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::errors::Result;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
}

/// A single path-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: FsOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// Item on the notifier's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierMessage {
    Event(FsEvent),
    Error(String),
}

/// Directory-level watch registration.
pub trait ChangeNotifier: Send {
    fn add_watch(&mut self, path: &Path) -> Result<()>;
    fn remove_watch(&mut self, path: &Path) -> Result<()>;

    /// Release the underlying handle. After this returns the message stream
    /// yields no further items and is closed once drained.
    fn close(&mut self) -> Result<()>;
}

/// A freshly created notifier together with its message stream.
pub struct NotifierHandle {
    pub notifier: Box<dyn ChangeNotifier>,
    pub messages: mpsc::UnboundedReceiver<NotifierMessage>,
}

impl fmt::Debug for NotifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierHandle").finish_non_exhaustive()
    }
}

/// Creates one notifier per watch session.
pub trait NotifierFactory: Send + Sync {
    fn create(&self) -> Result<NotifierHandle>;
}
