// src/watch/tracker.rs

//! Directory tracker: owns the watch set and turns notifier events into
//! rebuild requests.
//!
//! The OS notifier is driven non-recursively, one registration per directory.
//! At startup [`DirectoryTracker::enlist`] walks every watch root; afterwards
//! [`DirectoryTracker::run`] keeps the set in sync as directories come and go,
//! and forwards trigger-file changes to the rebuild signal.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::signal::{RebuildSender, ShutdownListener};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::logging::Logger;
use crate::watch::filter::{is_excluded_dir, is_excluded_prefix, is_trigger_file};
use crate::watch::notifier::{ChangeNotifier, FsEvent, FsOp, NotifierMessage};

/// What a single event did, mostly for tests and debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    /// Directories were added to the watch set.
    Registered(usize),
    /// Directories were dropped from the watch set.
    Unregistered(usize),
    /// A trigger file changed and a rebuild was requested.
    RebuildRequested,
    /// A trigger file changed but a rebuild was already pending.
    Coalesced,
    Ignored,
}

pub struct DirectoryTracker {
    notifier: Box<dyn ChangeNotifier>,
    fs: Arc<dyn FileSystem>,
    excludes: Vec<PathBuf>,
    watched: BTreeSet<PathBuf>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for DirectoryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryTracker")
            .field("excludes", &self.excludes)
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl DirectoryTracker {
    pub fn new(
        notifier: Box<dyn ChangeNotifier>,
        fs: Arc<dyn FileSystem>,
        excludes: Vec<PathBuf>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            notifier,
            fs,
            excludes,
            watched: BTreeSet::new(),
            logger,
        }
    }

    /// Directories currently registered with the notifier.
    pub fn watched(&self) -> &BTreeSet<PathBuf> {
        &self.watched
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    /// Register every qualifying directory below `roots`.
    ///
    /// A root is registered unless it lies under an exclude prefix; a hidden
    /// root name is fine, hidden children are not. Failures are logged and
    /// the walk carries on.
    pub fn enlist(&mut self, roots: &[PathBuf]) {
        for root in roots {
            if is_excluded_prefix(root, &self.excludes) {
                self.logger.warn(&format!(
                    "Watch directory '{}' is excluded, skipping",
                    root.display()
                ));
                continue;
            }

            self.logger
                .info(&format!("Adding directory to watch list: {}", root.display()));
            self.register(root);
            self.enlist_subtree(root);
        }
    }

    /// Walk below `dir`, registering qualifying directories. Excluded
    /// directories, symlinks and directories already in the watch set are
    /// never descended into, so link cycles cannot grow the walk.
    fn enlist_subtree(&mut self, dir: &Path) -> usize {
        let mut added = 0;
        let mut stack = vec![dir.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let entries = match self.fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    self.logger.warn(&format!(
                        "Failed to list directory '{}': {err:#}",
                        dir.display()
                    ));
                    continue;
                }
            };

            for path in entries {
                if !self.fs.is_dir(&path)
                    || self.fs.is_symlink(&path)
                    || is_excluded_dir(&path, &self.excludes)
                    || self.watched.contains(&path)
                {
                    continue;
                }
                if self.register(&path) {
                    added += 1;
                }
                stack.push(path);
            }
        }

        added
    }

    fn register(&mut self, dir: &Path) -> bool {
        if self.watched.contains(dir) {
            return false;
        }
        match self.notifier.add_watch(dir) {
            Ok(()) => {
                debug!(dir = %dir.display(), "watching directory");
                self.watched.insert(dir.to_path_buf());
                true
            }
            Err(err) => {
                self.logger.warn(&format!(
                    "Failed to add directory '{}' to the watcher: {err}",
                    dir.display()
                ));
                false
            }
        }
    }

    /// Drop `dir` and every tracked directory below it.
    fn unregister(&mut self, dir: &Path) -> usize {
        let doomed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();

        for path in &doomed {
            // The OS usually drops watches on deleted directories by itself,
            // so a failure here is expected.
            if let Err(err) = self.notifier.remove_watch(path) {
                debug!(dir = %path.display(), error = %err, "remove_watch failed");
            }
            self.watched.remove(path);
        }

        doomed.len()
    }

    /// Apply one notifier event.
    pub fn handle_event(&mut self, event: &FsEvent, rebuild: &RebuildSender) -> EventEffect {
        let path = event.path.as_path();

        if matches!(event.op, FsOp::Remove | FsOp::Rename) && self.watched.contains(path) {
            return EventEffect::Unregistered(self.unregister(path));
        }

        if self.fs.is_dir(path) {
            return self.handle_dir_event(path, event.op);
        }

        if !is_trigger_file(path) {
            return EventEffect::Ignored;
        }

        if rebuild.try_notify() {
            self.logger
                .info(&format!("File '{}' changed, recompile...", path.display()));
            EventEffect::RebuildRequested
        } else {
            debug!(path = %path.display(), "rebuild already pending");
            EventEffect::Coalesced
        }
    }

    fn handle_dir_event(&mut self, dir: &Path, op: FsOp) -> EventEffect {
        if op != FsOp::Create
            || is_excluded_dir(dir, &self.excludes)
            || self.fs.is_symlink(dir)
        {
            return EventEffect::Ignored;
        }

        // Only directories reachable through the watch set qualify.
        let parent_watched = dir.parent().is_some_and(|p| self.watched.contains(p));
        if !parent_watched {
            return EventEffect::Ignored;
        }

        let mut added = usize::from(self.register(dir));
        added += self.enlist_subtree(dir);
        EventEffect::Registered(added)
    }

    /// Consume notifier messages until the stream closes or shutdown fires,
    /// then hand the tracker back so its owner can close the notifier.
    pub async fn run(
        mut self,
        mut messages: mpsc::UnboundedReceiver<NotifierMessage>,
        rebuild: RebuildSender,
        mut shutdown: ShutdownListener,
    ) -> Self {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait() => {
                    debug!("event worker observed shutdown");
                    break;
                }

                message = messages.recv() => match message {
                    Some(NotifierMessage::Event(event)) => {
                        let effect = self.handle_event(&event, &rebuild);
                        debug!(?event, ?effect, "handled file-system event");
                    }
                    Some(NotifierMessage::Error(err)) => {
                        self.logger.error(&format!("Error while watching files: {err}"));
                    }
                    None => {
                        debug!("notifier stream closed");
                        break;
                    }
                },
            }
        }
        self
    }

    /// Release the notifier.
    pub fn close(mut self) -> Result<()> {
        self.watched.clear();
        self.notifier.close()
    }
}
