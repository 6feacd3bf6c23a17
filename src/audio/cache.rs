//! Content-addressed audio cache
//!
//! A rendered phrase is stored under its own text with all whitespace removed,
//! so the same phrase resolves to the same file no matter which processor
//! asked for it. Entries are never evicted; delete the directory to invalidate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// Maximum number of UTF-8 bytes kept from a normalized query.
///
/// Keeps file names well under the 255-byte limit of common filesystems.
/// Distinct queries sharing this prefix collide.
pub const MAX_KEY_BYTES: usize = 150;

/// File extension of cached provider audio
pub const CACHE_EXTENSION: &str = "mp3";

/// Stand-in for characters that cannot appear in a file name
const REPLACEMENT: char = '_';

type LockMap = Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>;

/// Turn `query` into a single file name component
///
/// Whitespace is removed, path separators and NUL are replaced, and the
/// result is cut at the last character boundary within [`MAX_KEY_BYTES`].
#[must_use]
pub fn normalize_key(query: &str) -> String {
    let mut key = String::new();
    for c in query.chars().filter(|c| !c.is_whitespace()) {
        let c = match c {
            '/' | '\\' | '\0' => REPLACEMENT,
            c => c,
        };
        if key.len() + c.len_utf8() > MAX_KEY_BYTES {
            break;
        }
        key.push(c);
    }
    key
}

/// Maps query text to stable on-disk audio paths
#[derive(Debug, Clone)]
pub struct FingerprintCache {
    root: PathBuf,
    locks: LockMap,
}

/// Held while one cache entry is being written
///
/// Dropping the last holder of a key also forgets the key.
#[derive(Debug)]
pub struct EntryLock {
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
    path: PathBuf,
}

impl Drop for EntryLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.path)
            .is_some_and(|key_lock| Arc::strong_count(key_lock) == 1)
        {
            locks.remove(&self.path);
        }
    }
}

impl FingerprintCache {
    /// Create a cache rooted at `root`
    ///
    /// The directory is not created until something is written into it.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cache root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path where the rendering of `query` lives (or will live)
    #[must_use]
    pub fn cache_path(&self, query: &str) -> PathBuf {
        self.root
            .join(format!("{}.{CACHE_EXTENSION}", normalize_key(query)))
    }

    /// True iff a regular file exists at `path`
    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Acquire the write lock for one cache path
    ///
    /// Two tasks rendering the same text must not both call the provider and
    /// race on the file; the second one waits here and then finds the entry.
    pub async fn lock(&self, path: &Path) -> EntryLock {
        let key_lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        EntryLock {
            guard: Some(key_lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
            path: path.to_path_buf(),
        }
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
