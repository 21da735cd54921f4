use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Advisory locks keyed by absolute path.
///
/// Owned by the pipeline and shared by reference with execute workers.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<PathBuf>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every path or none. Returns `None` when any is already held.
    pub fn try_lock<'a, I>(&'a self, paths: I) -> Option<LockGuard<'a>>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let mut keys: Vec<PathBuf> = paths.into_iter().map(|p| lock_key(p.as_ref())).collect();
        keys.sort();
        keys.dedup();

        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if keys.iter().any(|k| held.contains(k)) {
            return None;
        }
        held.extend(keys.iter().cloned());
        Some(LockGuard { table: self, keys })
    }

    fn release(&self, keys: &[PathBuf]) {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        for k in keys {
            held.remove(k);
        }
    }
}

/// Releases its paths on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    keys: Vec<PathBuf>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.keys);
    }
}

fn lock_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
