// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockEntry {
    File,
    Dir,
    /// A symlink pointing at a directory. Listed by its parent but never
    /// expanded.
    DirLink,
}

/// In-memory directory tree.
///
/// Entries are keyed by full path; children are found by prefix, so adding a
/// nested path creates every missing parent directory.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        Self::insert_with_parents(&mut entries, path.as_ref(), MockEntry::Dir);
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        Self::insert_with_parents(&mut entries, path.as_ref(), MockEntry::File);
    }

    /// Add a symlink at `path` that resolves to some directory.
    pub fn add_dir_link(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        Self::insert_with_parents(&mut entries, path.as_ref(), MockEntry::DirLink);
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock().retain(|p, _| !p.starts_with(path));
    }

    fn insert_with_parents(
        entries: &mut BTreeMap<PathBuf, MockEntry>,
        path: &Path,
        kind: MockEntry,
    ) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            parent = dir.parent();
        }
        entries.insert(path.to_path_buf(), kind);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FileSystem for MockFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.lock().get(path),
            Some(MockEntry::Dir | MockEntry::DirLink)
        )
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::DirLink))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path))
                .cloned()
                .collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
