use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use gorunner::errors::Result;
use gorunner::watch::{ChangeNotifier, FsEvent, FsOp, NotifierFactory, NotifierHandle, NotifierMessage};

#[derive(Debug, Default)]
struct Shared {
    watched: BTreeSet<PathBuf>,
    sender: Option<mpsc::UnboundedSender<NotifierMessage>>,
    created: usize,
    closed: usize,
    fail_next_create: bool,
}

/// Notifier factory whose notifiers only record registrations. Tests push
/// events through [`FakeNotifierFactory::emit`] as if the OS had reported
/// them.
///
/// Clones share state, like [`crate::fake_backend::FakeBackend`].
#[derive(Debug, Clone, Default)]
pub struct FakeNotifierFactory {
    shared: Arc<Mutex<Shared>>,
}

impl FakeNotifierFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn NotifierFactory> {
        Box::new(self.clone())
    }

    /// Make the next `create()` fail.
    pub fn fail_next_create(&self) {
        self.shared.lock().unwrap().fail_next_create = true;
    }

    /// The current watch set.
    pub fn watched(&self) -> BTreeSet<PathBuf> {
        self.shared.lock().unwrap().watched.clone()
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.shared.lock().unwrap().watched.contains(path)
    }

    pub fn created(&self) -> usize {
        self.shared.lock().unwrap().created
    }

    pub fn closed(&self) -> usize {
        self.shared.lock().unwrap().closed
    }

    /// Deliver an event to the current session. Returns `false` if no
    /// notifier is open.
    pub fn emit(&self, path: impl Into<PathBuf>, op: FsOp) -> bool {
        self.send(NotifierMessage::Event(FsEvent::new(path, op)))
    }

    pub fn emit_error(&self, message: &str) -> bool {
        self.send(NotifierMessage::Error(message.to_string()))
    }

    fn send(&self, message: NotifierMessage) -> bool {
        let shared = self.shared.lock().unwrap();
        shared
            .sender
            .as_ref()
            .is_some_and(|tx| tx.send(message).is_ok())
    }
}

impl NotifierFactory for FakeNotifierFactory {
    fn create(&self) -> Result<NotifierHandle> {
        let mut shared = self.shared.lock().unwrap();
        if std::mem::take(&mut shared.fail_next_create) {
            return Err(anyhow::anyhow!("too many open files").into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        shared.sender = Some(tx);
        shared.watched.clear();
        shared.created += 1;

        Ok(NotifierHandle {
            notifier: Box::new(FakeNotifier {
                shared: Arc::clone(&self.shared),
            }),
            messages: rx,
        })
    }
}

struct FakeNotifier {
    shared: Arc<Mutex<Shared>>,
}

impl ChangeNotifier for FakeNotifier {
    fn add_watch(&mut self, path: &Path) -> Result<()> {
        self.shared.lock().unwrap().watched.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_watch(&mut self, path: &Path) -> Result<()> {
        self.shared.lock().unwrap().watched.remove(path);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.sender = None;
        shared.watched.clear();
        shared.closed += 1;
        Ok(())
    }
}
