//! JSON snapshot storage implementation
//!
//! The whole store is one JSON object keyed by item id. Every write replaces the file
//! atomically: serialize, write `<path>.tmp`, rename over `<path>`.

use crate::storage::lock::StoreLock;
use crate::storage::traits::{ItemStore, StoreError, StoreResult};
use crate::storage::{ItemUpdate, PersistedItem};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// When mutations reach the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Write the snapshot after every upsert
    #[default]
    Immediate,
    /// Write after every n upserts and on `flush`
    Batched(usize),
}

impl WritePolicy {
    /// Maps the `flush-every` setting: 0 or 1 is immediate, larger values batch
    pub fn from_flush_every(n: usize) -> Self {
        if n <= 1 {
            Self::Immediate
        } else {
            Self::Batched(n)
        }
    }

    fn threshold(&self) -> usize {
        match self {
            Self::Immediate => 1,
            Self::Batched(n) => (*n).max(1),
        }
    }
}

/// Snapshot-file store backend
pub struct SnapshotStore {
    path: PathBuf,
    items: BTreeMap<String, PersistedItem>,
    policy: WritePolicy,
    pending: usize,
    _lock: StoreLock,
}

impl SnapshotStore {
    /// Opens (or initializes) the store at `path`
    ///
    /// Creates parent directories, takes the single-writer lock, then loads the
    /// snapshot. A missing file is initialized with an empty object. Opening an
    /// existing store is idempotent.
    ///
    /// # Arguments
    ///
    /// * `path` - Snapshot file
    /// * `policy` - Write policy for upserts
    ///
    /// # Returns
    ///
    /// * `Ok(SnapshotStore)` - Store ready for use
    /// * `Err(StoreError)` - Locked, unreadable or corrupt
    pub fn open(path: &Path, policy: WritePolicy) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock = StoreLock::acquire(path)?;

        let items = if path.exists() {
            load_snapshot(path)?
        } else {
            let empty = BTreeMap::new();
            write_snapshot(path, &empty)?;
            tracing::info!("Initialized empty store at {}", path.display());
            empty
        };

        tracing::debug!(
            "Opened store {} with {} items ({:?})",
            path.display(),
            items.len(),
            policy
        );

        Ok(Self {
            path: path.to_path_buf(),
            items,
            policy,
            pending: 0,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of upserts not yet written
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn persist(&mut self) -> StoreResult<()> {
        write_snapshot(&self.path, &self.items)?;
        tracing::trace!(
            "Persisted {} items ({} pending mutations)",
            self.items.len(),
            self.pending
        );
        self.pending = 0;
        Ok(())
    }
}

impl ItemStore for SnapshotStore {
    fn has(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<PersistedItem> {
        self.items.get(id).cloned()
    }

    fn upsert(&mut self, id: &str, update: ItemUpdate) -> StoreResult<bool> {
        let now = Utc::now();
        let previous = self.items.get(id).cloned();
        let is_new = match self.items.get_mut(id) {
            Some(existing) => {
                existing.merge(update, now);
                false
            }
            None => {
                self.items
                    .insert(id.to_string(), PersistedItem::create(id, update, now));
                true
            }
        };

        self.pending += 1;
        if self.pending >= self.policy.threshold() {
            if let Err(e) = self.persist() {
                match previous {
                    Some(item) => self.items.insert(id.to_string(), item),
                    None => self.items.remove(id),
                };
                self.pending -= 1;
                return Err(e);
            }
        }

        Ok(is_new)
    }

    fn get_all(&self) -> Vec<PersistedItem> {
        self.items.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.pending > 0 {
            self.persist()?;
        }
        Ok(())
    }
}

impl Drop for SnapshotStore {
    fn drop(&mut self) {
        if self.pending > 0 {
            if let Err(e) = self.persist() {
                tracing::error!(
                    "Failed to flush store {} on close: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Reads a snapshot without locking or creating it
///
/// Used by reporting commands that must not contend with a running crawl. A
/// missing file reads as an empty store.
///
/// # Returns
///
/// * `Ok(Vec<PersistedItem>)` - Items ordered by id
/// * `Err(StoreError)` - Unreadable or corrupt file
pub fn read_snapshot(path: &Path) -> StoreResult<Vec<PersistedItem>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(load_snapshot(path)?.into_values().collect())
}

fn load_snapshot(path: &Path) -> StoreResult<BTreeMap<String, PersistedItem>> {
    let content = std::fs::read(path)?;
    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(BTreeMap::new());
    }

    serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn write_snapshot(path: &Path, items: &BTreeMap<String, PersistedItem>) -> StoreResult<()> {
    let payload = serde_json::to_vec_pretty(items)?;

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, payload)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
