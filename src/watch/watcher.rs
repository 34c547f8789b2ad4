// src/watch/watcher.rs

//! `notify`-backed implementation of [`ChangeNotifier`].

use std::path::Path;

use anyhow::anyhow;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;
use crate::watch::notifier::{
    ChangeNotifier, FsEvent, FsOp, NotifierFactory, NotifierHandle, NotifierMessage,
};

/// Handle for the OS file watcher.
///
/// Each directory is registered non-recursively; the directory tracker
/// decides which subdirectories qualify. Dropping (or closing) the handle
/// drops the callback and with it the sending half of the message stream.
pub struct NotifyWatcher {
    inner: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl NotifyWatcher {
    /// Start an OS watcher with nothing registered yet.
    pub fn spawn() -> Result<NotifierHandle> {
        // Channel from the blocking notify callback into the async world.
        let (tx, rx) = mpsc::unbounded_channel::<NotifierMessage>();

        // Closure called synchronously by notify whenever an event arrives.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let messages = match res {
                    Ok(event) => {
                        debug!(?event, "received notify event");
                        translate_event(&event)
                            .into_iter()
                            .map(NotifierMessage::Event)
                            .collect()
                    }
                    Err(err) => vec![NotifierMessage::Error(err.to_string())],
                };
                for message in messages {
                    // The receiver only goes away during shutdown.
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            },
            Config::default(),
        )?;

        Ok(NotifierHandle {
            notifier: Box::new(NotifyWatcher {
                inner: Some(watcher),
            }),
            messages: rx,
        })
    }

    fn watcher(&mut self) -> Result<&mut RecommendedWatcher> {
        self.inner
            .as_mut()
            .ok_or_else(|| anyhow!("file watcher already closed").into())
    }
}

impl ChangeNotifier for NotifyWatcher {
    fn add_watch(&mut self, path: &Path) -> Result<()> {
        self.watcher()?.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn remove_watch(&mut self, path: &Path) -> Result<()> {
        self.watcher()?.unwatch(path)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

/// Production [`NotifierFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyFactory;

impl NotifierFactory for NotifyFactory {
    fn create(&self) -> Result<NotifierHandle> {
        NotifyWatcher::spawn()
    }
}

/// Flatten a `notify` event into path-level operations.
///
/// Renames are split: the old name becomes `Rename` (it went away), the new
/// name becomes `Create` (it appeared). Access and metadata-less events are
/// dropped.
pub fn translate_event(event: &Event) -> Vec<FsEvent> {
    let op_for_all = |op: FsOp| -> Vec<FsEvent> {
        event.paths.iter().map(|p| FsEvent::new(p.clone(), op)).collect()
    };

    match event.kind {
        EventKind::Create(_) => op_for_all(FsOp::Create),
        EventKind::Remove(_) => op_for_all(FsOp::Remove),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => op_for_all(FsOp::Create),
            RenameMode::From => op_for_all(FsOp::Rename),
            RenameMode::Both => event
                .paths
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let op = if i == 0 { FsOp::Rename } else { FsOp::Create };
                    FsEvent::new(p.clone(), op)
                })
                .collect(),
            RenameMode::Any | RenameMode::Other => event
                .paths
                .iter()
                .map(|p| {
                    let op = if p.exists() { FsOp::Create } else { FsOp::Rename };
                    FsEvent::new(p.clone(), op)
                })
                .collect(),
        },
        EventKind::Modify(_) => op_for_all(FsOp::Write),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::path::PathBuf;

    #[test]
    fn translates_basic_kinds() {
        let create = Event::new(EventKind::Create(CreateKind::Folder))
            .add_path(PathBuf::from("/proj/pkg"));
        assert_eq!(
            translate_event(&create),
            vec![FsEvent::new("/proj/pkg", FsOp::Create)]
        );

        let write = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/proj/main.go"));
        assert_eq!(
            translate_event(&write),
            vec![FsEvent::new("/proj/main.go", FsOp::Write)]
        );

        let remove = Event::new(EventKind::Remove(RemoveKind::Any))
            .add_path(PathBuf::from("/proj/old"));
        assert_eq!(
            translate_event(&remove),
            vec![FsEvent::new("/proj/old", FsOp::Remove)]
        );
    }

    #[test]
    fn rename_both_splits_into_rename_and_create() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/proj/a"))
            .add_path(PathBuf::from("/proj/b"));

        assert_eq!(
            translate_event(&event),
            vec![
                FsEvent::new("/proj/a", FsOp::Rename),
                FsEvent::new("/proj/b", FsOp::Create),
            ]
        );
    }

    #[test]
    fn access_events_are_ignored() {
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/proj/main.go"));
        assert!(translate_event(&event).is_empty());
    }

    #[test]
    fn closed_watcher_rejects_new_watches() {
        let tmp = tempfile::tempdir().unwrap();
        let mut handle = NotifyWatcher::spawn().unwrap();

        handle.notifier.add_watch(tmp.path()).unwrap();
        handle.notifier.close().unwrap();

        assert!(handle.notifier.add_watch(tmp.path()).is_err());
    }
}
