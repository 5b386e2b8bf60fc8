//! Single-writer lock for a store path

use crate::storage::traits::{StoreError, StoreResult};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Exclusive `<store>.lock` file, removed when dropped
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Creates the lock file next to `store_path`
    ///
    /// Fails with [`StoreError::Locked`] when the file already exists. A lock left
    /// behind by a crashed process has to be removed by hand.
    pub fn acquire(store_path: &Path) -> StoreResult<Self> {
        let path = lock_path(store_path);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id())?;
                tracing::debug!("Acquired store lock {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                Err(StoreError::Locked { path, holder })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove store lock {}: {}", self.path.display(), e);
        }
    }
}

/// `<store_path>.lock`
pub fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}
